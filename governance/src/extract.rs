//! Response extraction for node CLI output
//!
//! The CLI mixes prose, `Label: value` lines and embedded JSON. Every
//! function here is total: a missing or malformed field yields `None`
//! (or `false`), never an error, because absent fields are an expected
//! outcome (a proposal id that is not assigned yet, a status that has
//! not been recorded). Callers compose them with `Option::or_else`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Label preceding a contract call's JSON result
pub const CONTRACT_RESPONSE_MARKER: &str = "contract response:";

/// Array of recorded outputs in a `tx query` response
pub const TX_OUTPUTS_FIELD: &str = "txOutputsExt";

/// Storage bucket holding proposal records
pub const PROPOSAL_BUCKET: &str = "proposal";

pub static TX_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Tx id:\s*([A-Fa-f0-9]+)").expect("tx id pattern"));

pub static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"address:\s*([A-Za-z0-9]+)").expect("address pattern"));

pub static PROPOSAL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"contract response:\s*(\d+)").expect("proposal id pattern"));

static PROPOSAL_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""key":\s*"(\d+)""#).expect("proposal key pattern"));

/// Decode the first JSON value following `marker`.
///
/// Text after that value (a trailing `Tx id:` line, for instance) is ignored.
pub fn json_after_marker(raw: &str, marker: &str) -> Option<Value> {
    let start = raw.find(marker)? + marker.len();
    first_json_value(&raw[start..])
}

fn first_json_value(text: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(text.trim_start())
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// Decode output that is either bare JSON or carries a contract response.
pub fn response_json(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim())
        .ok()
        .or_else(|| json_after_marker(raw, CONTRACT_RESPONSE_MARKER))
}

/// First capture group of `pattern` in `raw`.
pub fn labeled_token(raw: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(raw)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

pub fn transaction_id(raw: &str) -> Option<String> {
    labeled_token(raw, &TX_ID_PATTERN)
}

pub fn proposal_id(raw: &str) -> Option<String> {
    labeled_token(raw, &PROPOSAL_ID_PATTERN)
}

pub fn default_address(raw: &str) -> Option<String> {
    labeled_token(raw, &ADDRESS_PATTERN)
}

/// Find the recorded output for `bucket`/`key` in a decoded transaction.
///
/// The `value` field is itself JSON-decoded when it parses; otherwise it is
/// returned as stored.
pub fn nested_transaction_output(tx_json: &Value, bucket: &str, key: &str) -> Option<Value> {
    let value = tx_json
        .get(TX_OUTPUTS_FIELD)?
        .as_array()?
        .iter()
        .find(|output| {
            str_field(output, "bucket") == Some(bucket) && str_field(output, "key") == Some(key)
        })?
        .get("value")?;

    match value {
        Value::String(text) => Some(serde_json::from_str(text).unwrap_or_else(|_| value.clone())),
        other => Some(other.clone()),
    }
}

/// Recover a proposal id from a `tx query` response.
///
/// Walks the decoded outputs first and falls back to scanning raw lines for
/// the proposal bucket when the response is not clean JSON.
pub fn proposal_key_from_transaction(raw: &str) -> Option<String> {
    serde_json::from_str::<Value>(raw.trim())
        .ok()
        .and_then(|tx| proposal_key_from_outputs(&tx))
        .or_else(|| {
            raw.lines()
                .filter(|line| {
                    line.contains("bucket")
                        && line.contains(PROPOSAL_BUCKET)
                        && line.contains("key")
                })
                .find_map(|line| labeled_token(line, &PROPOSAL_KEY_PATTERN))
        })
}

fn proposal_key_from_outputs(tx_json: &Value) -> Option<String> {
    tx_json
        .get(TX_OUTPUTS_FIELD)?
        .as_array()?
        .iter()
        .filter(|output| str_field(output, "bucket") == Some(PROPOSAL_BUCKET))
        .filter_map(|output| str_field(output, "key"))
        .find(|key| !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

/// First proposal record in a transaction's outputs, for when the id is unknown.
pub fn first_proposal_output(tx_json: &Value) -> Option<Value> {
    let key = proposal_key_from_outputs(tx_json)?;
    nested_transaction_output(tx_json, PROPOSAL_BUCKET, &key)
}

/// Read `blockchains[0].ledger.trunkHeight` from a `status` response.
pub fn chain_height(status: &Value) -> Option<u64> {
    status
        .get("blockchains")?
        .get(0)?
        .get("ledger")?
        .get("trunkHeight")
        .and_then(value_as_u64)
}

/// Whether the active consensus is `target`.
///
/// Checks `consensusName` and then `consensus.name`, since node versions
/// report it in either place.
pub fn consensus_name_matches(status: &Value, target: &str) -> bool {
    let Some(chain) = status.get("blockchains").and_then(|c| c.get(0)) else {
        return false;
    };

    let primary = str_field(chain, "consensusName");
    let nested = chain.get("consensus").and_then(|c| str_field(c, "name"));

    [primary, nested]
        .into_iter()
        .flatten()
        .any(|name| name.eq_ignore_ascii_case(target))
}

/// Numbers and numeric strings both decode; anything else is `None`.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty and ASCII alphanumeric. Advisory only.
pub fn looks_like_address(address: &str) -> bool {
    !address.is_empty() && address.chars().all(|c| c.is_ascii_alphanumeric())
}

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

//! Replaying adapters that serve recorded interactions from cassettes.

pub mod earth_engine;

use std::sync::{Arc, Mutex, PoisonError};

use crate::cassette::replayer::CassetteReplayer;
use crate::error::ExtractError;

/// Fetch the next recorded output for `port::method` and decode it.
///
/// Outputs follow the recorder's convention: `{"Ok": value}` or
/// `{"Err": message}`. Bare values are treated as `Ok`.
pub(crate) fn replay_next<T: serde::de::DeserializeOwned>(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> Result<T, ExtractError> {
    let interaction = replayer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .next_interaction(port, method)
        .map_err(ExtractError::Config)?;
    let output = interaction.output;

    if let Some(err_val) = output.get("Err").or_else(|| output.get("err")) {
        let message = err_val.as_str().unwrap_or("replayed error").to_string();
        return Err(ExtractError::Replayed(message));
    }
    let value = match output.get("Ok").or_else(|| output.get("ok")).cloned() {
        Some(ok_val) => ok_val,
        None => output,
    };
    serde_json::from_value(value).map_err(|e| {
        ExtractError::Config(format!("Recorded output for {port}::{method} does not decode: {e}"))
    })
}

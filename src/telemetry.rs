use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

use crate::Result;
use crate::error::Error;

const FALLBACK_FILTER: &str = "info";

/// Install the global tracing subscriber.
///
/// The filter is the first valid candidate among `explicit_filter`,
/// `RUST_LOG` and `info`.
///
/// # Errors
///
/// Fails when JSON output is requested from a build without the `json-logs`
/// feature, or when a global subscriber is already installed.
pub fn init_tracing(explicit_filter: Option<&str>, use_json: bool) -> Result<()> {
    let env = std::env::var("RUST_LOG").ok();
    let filter = resolve_filter(explicit_filter, env.as_deref())?;

    #[cfg(feature = "json-logs")]
    if use_json {
        let subscriber = Registry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .flatten_event(true),
        );
        return tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| Error::Telemetry(err.to_string()));
    }

    #[cfg(not(feature = "json-logs"))]
    if use_json {
        return Err(Error::Telemetry(
            "binary was built without the `json-logs` feature".to_string(),
        ));
    }

    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| Error::Telemetry(err.to_string()))
}

fn resolve_filter(explicit: Option<&str>, env: Option<&str>) -> Result<EnvFilter> {
    [explicit, env, Some(FALLBACK_FILTER)]
        .into_iter()
        .flatten()
        .find_map(|candidate| EnvFilter::try_new(candidate).ok())
        .ok_or_else(|| Error::Telemetry("invalid log filter".to_string()))
}

#[cfg(test)]
mod tests {
    use super::resolve_filter;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn invalid_candidates_fall_through_to_the_next_one() {
        match resolve_filter(Some("toast_engine=loudest"), Some("debug")) {
            Ok(filter) => assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG)),
            Err(err) => panic!("expected a filter: {err}"),
        }
    }

    #[test]
    fn falls_back_to_info() {
        match resolve_filter(None, None) {
            Ok(filter) => assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO)),
            Err(err) => panic!("expected a filter: {err}"),
        }
    }
}

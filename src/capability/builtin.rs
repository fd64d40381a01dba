//! Built-in capabilities
//!
//! Small, dependency-free capabilities that are always available to seed the
//! catalog.

use chrono::Local;

use crate::capability::spec::{CapabilitySpec, FieldSpec};
use crate::capability::set::CapabilitySet;
use crate::core::Result;

pub const DATE_TIME_ID: &str = "date-time";
pub const ECHO_ID: &str = "echo";

/// Reports the current local date and time
pub fn date_time() -> Result<CapabilitySpec> {
    CapabilitySpec::builder()
        .with_id(DATE_TIME_ID)
        .with_name("Date and time")
        .with_description("Returns the current local date and time")
        .with_fn(|_| Ok(Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string()))
        .build()
}

/// Returns its arguments unchanged
pub fn echo() -> Result<CapabilitySpec> {
    CapabilitySpec::builder()
        .with_id(ECHO_ID)
        .with_name("Echo")
        .with_description("Repeats back exactly what it receives")
        .with_field(FieldSpec::string("text", "Text to repeat"))
        .with_fn(|args| Ok(args.to_string()))
        .build()
}

/// Every built-in capability
pub fn builtin_set() -> Result<CapabilitySet> {
    CapabilitySet::with_specs("builtin", vec![date_time()?, echo()?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_input() {
        let echo = echo().unwrap();
        assert_eq!(echo.invoke(r#"{"text":"hi"}"#).await.unwrap(), r#"{"text":"hi"}"#);
    }

    #[tokio::test]
    async fn test_date_time_is_non_empty() {
        let out = date_time().unwrap().invoke("{}").await.unwrap();
        assert!(out.len() >= 19);
    }

    #[test]
    fn test_builtin_set() {
        let set = builtin_set().unwrap();
        assert_eq!(set.ids(), vec![DATE_TIME_ID, ECHO_ID]);
    }
}

//! Mapping of library failures onto user-facing error classes.

use provctl_cli_common::errors::{detail, DisplayedError};
use provctl_providers::ControlError;

/// Attaches `context` to a control failure, keeping its class.
pub(crate) fn displayed(context: impl Into<String>) -> impl FnOnce(ControlError) -> DisplayedError {
    move |e| {
        let context = context.into();
        match e {
            ControlError::Configuration(m) => DisplayedError::UserError(context, detail(m)),
            ControlError::Provisioning(m) => DisplayedError::ProvisioningError(context, detail(m)),
            ControlError::Startup(m) => DisplayedError::StartupError(context, detail(m)),
            ControlError::Cancelled => DisplayedError::Cancelled,
            ControlError::Internal(m) => DisplayedError::InternalError(context, detail(m)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_survive_conversion() {
        let cases = [
            ControlError::Configuration("no provider selected".to_owned()),
            ControlError::Provisioning("not enough accounts".to_owned()),
            ControlError::Startup("not ready".to_owned()),
            ControlError::Cancelled,
            ControlError::Internal("disk full".to_owned()),
        ];
        for e in cases {
            let code = e.exit_code();
            assert_eq!(displayed("start failed")(e).exit_code(), code);
        }

        let err = displayed("init failed")(ControlError::Provisioning("short".to_owned()));
        assert_eq!(err.to_string(), "Provisioning error: init failed: short");
    }
}

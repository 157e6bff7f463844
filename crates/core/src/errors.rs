use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown task tag `{0}`")]
    UnknownTask(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "Sorry, I didn't quite get that. Could you tell me again in a few words?"
            }
            Self::ServiceUnavailable { .. } => {
                "I'm having trouble reaching our systems. Please try again in a moment."
            }
            Self::Internal { .. } => "Something went wrong on our side. Please try again.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn unknown_task_maps_to_bad_request_with_correlation_id() {
        let interface = ApplicationError::from(DomainError::UnknownTask("Z9".to_owned()))
            .into_interface("turn-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref message,
            } if correlation_id == "turn-1" && message.contains("Z9")
        ));
    }

    #[test]
    fn bad_request_message_is_a_reprompt() {
        let interface = ApplicationError::from(DomainError::InvariantViolation(
            "offer presented without readiness".to_owned(),
        ))
        .into_interface("turn-2");

        assert_eq!(
            interface.user_message(),
            "Sorry, I didn't quite get that. Could you tell me again in a few words?"
        );
        assert_eq!(interface.correlation_id(), "turn-2");
    }

    #[test]
    fn persistence_and_integration_map_to_service_unavailable() {
        for error in [
            ApplicationError::Persistence("database is locked".to_owned()),
            ApplicationError::Integration("llm timed out".to_owned()),
        ] {
            let interface = error.into_interface("turn-3");
            assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        }
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("missing api key".to_owned())
            .into_interface("turn-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "Something went wrong on our side. Please try again.");
    }
}

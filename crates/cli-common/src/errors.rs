use std::fmt;

/// Errors displayed to the user when using the CLI.
///
/// Each class maps to its own process exit status so outer tooling can pick
/// a recovery action without parsing messages.
#[derive(Debug)]
pub enum DisplayedError {
    /// Errors the user can address by updating configuration or providing expected input
    UserError(String, Box<dyn fmt::Debug>),
    /// Funded accounts could not be generated.
    ProvisioningError(String, Box<dyn fmt::Debug>),
    /// The node did not start or never became ready.
    StartupError(String, Box<dyn fmt::Debug>),
    /// Interrupted by a termination signal.
    Cancelled,
    /// Internal errors encountered when servicing user's request.
    InternalError(String, Box<dyn fmt::Debug>),
}

impl DisplayedError {
    pub fn exit_code(&self) -> u8 {
        match self {
            DisplayedError::UserError(..) => 2,
            DisplayedError::ProvisioningError(..) => 3,
            DisplayedError::StartupError(..) => 4,
            DisplayedError::Cancelled => 130,
            DisplayedError::InternalError(..) => 1,
        }
    }
}

/// Debug output that prints a message without quotes.
struct Detail(String);

impl fmt::Debug for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wraps a displayable cause so it renders as plain text.
pub fn detail(cause: impl fmt::Display) -> Box<dyn fmt::Debug> {
    Box::new(Detail(cause.to_string()))
}

#[inline]
pub fn user_error<E>(msg: impl Into<String>) -> impl FnOnce(E) -> DisplayedError
where
    E: fmt::Display,
{
    move |e| DisplayedError::UserError(msg.into(), detail(e))
}

#[inline]
pub fn internal_error<E>(msg: impl Into<String>) -> impl FnOnce(E) -> DisplayedError
where
    E: fmt::Display,
{
    move |e| DisplayedError::InternalError(msg.into(), detail(e))
}

pub trait DisplayableError {
    type Output;
    fn user_error(self, msg: impl Into<String>) -> Result<Self::Output, DisplayedError>;
    fn internal_error(self, msg: impl Into<String>) -> Result<Self::Output, DisplayedError>;
}

impl<T, E: fmt::Display> DisplayableError for Result<T, E> {
    type Output = T;
    #[inline]
    fn user_error(self, msg: impl Into<String>) -> Result<Self::Output, DisplayedError> {
        self.map_err(user_error(msg))
    }
    #[inline]
    fn internal_error(self, msg: impl Into<String>) -> Result<Self::Output, DisplayedError> {
        self.map_err(internal_error(msg))
    }
}

impl fmt::Display for DisplayedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayedError::UserError(msg, e) => {
                f.write_fmt(format_args!("Configuration error: {msg}: {e:?}"))
            }
            DisplayedError::ProvisioningError(msg, e) => {
                f.write_fmt(format_args!("Provisioning error: {msg}: {e:?}"))
            }
            DisplayedError::StartupError(msg, e) => {
                f.write_fmt(format_args!("Startup error: {msg}: {e:?}"))
            }
            DisplayedError::Cancelled => f.write_str("Cancelled"),
            DisplayedError::InternalError(msg, e) => {
                f.write_fmt(format_args!("Internal error: {msg}: {e:?}"))
            }
        }
    }
}

use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    NotAuthenticated,
    Authentication(String),
    DeAuthentication(String),
    CredentialsInvalid(String),
    TooManyAttempts(String),
    RedirectDidNotHappen(String),
    LoginUnexpected(String),
    LocationIdNotFound(String),
    Unauthorized,
    Unexpected(String),
    NoZonesFound,
    ZoneNotFound(i64),
    ZoneNameNotFound(String),
    TemperatureUnavailable(i64),
    MissingField(&'static str),
    InvalidControlField(String),
    InvalidHoldDuration(chrono::Duration),
    ControlRejected(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::NotAuthenticated => write!(f, "not authenticated"),
            Error::Authentication(msg) => write!(f, "unable to authenticate: {msg}"),
            Error::DeAuthentication(msg) => write!(f, "unable to deauthenticate: {msg}"),
            Error::CredentialsInvalid(user) => {
                write!(f, "email ({user}) and/or password appear to have been rejected")
            }
            Error::TooManyAttempts(url) => {
                write!(f, "{url} denoted that we have made too many attempts")
            }
            Error::RedirectDidNotHappen(url) => {
                write!(f, "{url} did not represent the needed redirect")
            }
            Error::LoginUnexpected(url) => write!(f, "{url} denotes an error"),
            Error::LocationIdNotFound(url) => {
                write!(f, "no location id in {url} or the response body")
            }
            Error::Unauthorized => write!(f, "got unauthorized response from server"),
            Error::Unexpected(msg) => write!(f, "unexpected response: {msg}"),
            Error::NoZonesFound => write!(f, "no zones were found for this location"),
            Error::ZoneNotFound(id) => write!(f, "missing device: {id}"),
            Error::ZoneNameNotFound(name) => {
                write!(f, "could not find a zone with the given name: {name}")
            }
            Error::TemperatureUnavailable(id) => {
                write!(f, "temperature is unavailable for device {id}")
            }
            Error::MissingField(key) => write!(f, "zone record is missing field: {key}"),
            Error::InvalidControlField(key) => {
                write!(f, "key {key} is not one of the valid control fields")
            }
            Error::InvalidHoldDuration(d) => {
                write!(f, "hold duration must be less than a day, got {d}")
            }
            Error::ControlRejected(body) => {
                write!(f, "success was not returned (success != 1): {body}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

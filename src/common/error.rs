use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fmt;

// device driver error
#[derive(Debug, Clone, PartialEq)]
pub struct DriverError(pub String);

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "device driver error msg: {}", self.0)
    }
}

impl Error for DriverError {}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError(format!("io error: {}", e))
    }
}

use std::fmt::Display;

use error_stack::Context;

#[derive(Debug)]
pub enum KernelError {
    Forbidden,
    NotFound,
    Conflict,
    Concurrency,
    Timeout,
    Internal,
}

impl Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::Forbidden => write!(f, "Actor is not permitted to perform this action"),
            KernelError::NotFound => write!(f, "Resource not found"),
            KernelError::Conflict => {
                write!(f, "Requested transition is not legal from the current state")
            }
            KernelError::Concurrency => write!(f, "Concurrency error"),
            KernelError::Timeout => write!(f, "Process timed out"),
            KernelError::Internal => write!(f, "Internal kernel error"),
        }
    }
}

impl Context for KernelError {}

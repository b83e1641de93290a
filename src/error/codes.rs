#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidConfig = 2,
    RootNotFound = 3,
    ListingError = 4,
    LookupError = 5,
    RenameError = 6,
    OutcomeLogError = 7,
    AuthError = 8,
    Cancelled = 130,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

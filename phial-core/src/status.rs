// HTTP status codes used by the dispatch core

/// Status codes the core and its default handlers produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,

    BadRequest = 400,
    NotFound = 404,
    PayloadTooLarge = 413,

    InternalServerError = 500,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn reason(&self) -> &'static str {
        match self {
            HttpStatus::Ok => "OK",
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::PayloadTooLarge => "Payload Too Large",
            HttpStatus::InternalServerError => "Internal Server Error",
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(HttpStatus::Ok),
            400 => Some(HttpStatus::BadRequest),
            404 => Some(HttpStatus::NotFound),
            413 => Some(HttpStatus::PayloadTooLarge),
            500 => Some(HttpStatus::InternalServerError),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code())
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code())
    }

    pub fn is_server_error(&self) -> bool {
        self.code() >= 500
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for status in [
            HttpStatus::Ok,
            HttpStatus::BadRequest,
            HttpStatus::NotFound,
            HttpStatus::PayloadTooLarge,
            HttpStatus::InternalServerError,
        ] {
            assert_eq!(HttpStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(HttpStatus::from_code(201), None);
        assert_eq!(HttpStatus::from_code(999), None);
    }

    #[test]
    fn test_categories() {
        assert!(HttpStatus::Ok.is_success());
        assert!(HttpStatus::NotFound.is_client_error());
        assert!(!HttpStatus::NotFound.is_server_error());
        assert!(HttpStatus::InternalServerError.is_server_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(HttpStatus::NotFound.to_string(), "404 Not Found");
        assert_eq!(u16::from(HttpStatus::InternalServerError), 500);
    }
}

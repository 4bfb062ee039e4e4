use time::{Duration, OffsetDateTime};

pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

pub(crate) const DEFAULT_REFRESH_MARGIN: Duration = Duration::seconds(10);

#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub expiry: Option<OffsetDateTime>,
}

impl Token {
    pub fn value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub fn valid(&self) -> bool {
        self.valid_with_margin(DEFAULT_REFRESH_MARGIN)
    }

    /// Like [`Token::valid`], treating the token as expired `margin` before its expiry.
    pub fn valid_with_margin(&self, margin: Duration) -> bool {
        !self.access_token.is_empty() && !self.expired(margin)
    }

    fn expired(&self, margin: Duration) -> bool {
        match self.expiry {
            None => false,
            Some(s) => {
                let now = OffsetDateTime::now_utc();
                let exp = s - margin;
                now > exp
            }
        }
    }
}

//! Recording mailer

use std::sync::Mutex;

use async_trait::async_trait;
use collabris::backend::mail::{Mail, MailError, Mailer};

/// Mailer that keeps every message in memory
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Mail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    /// The code in the most recent mail to `to`
    ///
    /// Codes are the only six-character uppercase alphanumeric word in the
    /// message body.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|mail| mail.to == to)
            .and_then(|mail| {
                mail.body
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .find(|word| {
                        word.len() == 6
                            && word
                                .chars()
                                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
                    })
                    .map(str::to_string)
            })
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

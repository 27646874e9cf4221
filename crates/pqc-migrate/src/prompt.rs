// ABOUTME: Collects the remote client's address, username and password before a run.
// ABOUTME: Values supplied on the command line or environment skip their prompt.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use std::fmt;

/// Everything needed to reach the remote client with a password.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of answers for the three interactive questions.
pub trait CredentialProvider {
    fn host(&self) -> Result<String>;
    fn user(&self) -> Result<String>;
    /// Read without echo.
    fn password(&self) -> Result<String>;
}

/// Asks on the terminal.
#[derive(Debug, Default)]
pub struct DialoguerPrompt;

impl CredentialProvider for DialoguerPrompt {
    fn host(&self) -> Result<String> {
        Input::<String>::new()
            .with_prompt("Client IP address")
            .interact_text()
            .context("Failed to read client IP address")
    }

    fn user(&self) -> Result<String> {
        Input::<String>::new()
            .with_prompt("Client username")
            .interact_text()
            .context("Failed to read client username")
    }

    fn password(&self) -> Result<String> {
        Password::new()
            .with_prompt("Client password")
            .interact()
            .context("Failed to read client password")
    }
}

/// Fill in whatever was not supplied up front by asking `provider`.
/// Questions are asked in the order host, user, password.
pub fn collect_credentials(
    provider: &dyn CredentialProvider,
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
) -> Result<ClientCredentials> {
    let host = match host {
        Some(host) => host,
        None => provider.host()?,
    };
    let user = match user {
        Some(user) => user,
        None => provider.user()?,
    };
    let password = match password {
        Some(password) => password,
        None => provider.password()?,
    };
    Ok(ClientCredentials {
        host: host.trim().to_string(),
        user: user.trim().to_string(),
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorded {
        asked: RefCell<Vec<&'static str>>,
    }

    impl CredentialProvider for Recorded {
        fn host(&self) -> Result<String> {
            self.asked.borrow_mut().push("host");
            Ok(" 192.168.1.20 ".to_string())
        }

        fn user(&self) -> Result<String> {
            self.asked.borrow_mut().push("user");
            Ok("pi".to_string())
        }

        fn password(&self) -> Result<String> {
            self.asked.borrow_mut().push("password");
            Ok(" secret ".to_string())
        }
    }

    #[test]
    fn test_prompts_in_order_when_nothing_supplied() {
        let provider = Recorded::default();
        let creds = collect_credentials(&provider, None, None, None).unwrap();

        assert_eq!(*provider.asked.borrow(), vec!["host", "user", "password"]);
        assert_eq!(creds.host, "192.168.1.20");
        assert_eq!(creds.user, "pi");
        assert_eq!(creds.password, " secret ", "passwords are taken verbatim");
    }

    #[test]
    fn test_supplied_values_skip_prompts() {
        let provider = Recorded::default();
        let creds = collect_credentials(
            &provider,
            Some("client.lan".to_string()),
            None,
            Some("pw".to_string()),
        )
        .unwrap();

        assert_eq!(*provider.asked.borrow(), vec!["user"]);
        assert_eq!(creds.host, "client.lan");
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = ClientCredentials {
            host: "h".to_string(),
            user: "u".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}

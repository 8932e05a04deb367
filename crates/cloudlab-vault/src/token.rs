//! Session token acquisition
//!
//! ```text
//! AwaitingInput ──input──▶ Probing ──accepted──▶ Valid
//!       ▲                     │
//!       └────rejected─────────┤ (attempts left)
//!                             └──rejected──▶ Exhausted
//! ```

use crate::api::VaultApi;
use cloudlab_core::{LabError, Prompt, Reporter, Result};

/// Where the acquisition loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    AwaitingInput { attempt: u32 },
    Probing { attempt: u32, token: String },
    Valid(String),
    Exhausted { attempts: u32 },
}

/// Ask for a token until the server accepts one.
///
/// Empty input selects `default_token`; empty input without a default counts
/// as a rejected attempt. There is no delay between attempts. A server that
/// cannot be reached aborts immediately instead of consuming attempts. On
/// success the token is installed on `api` for subsequent calls.
pub async fn acquire_token(
    api: &dyn VaultApi,
    prompt: &dyn Prompt,
    reporter: &dyn Reporter,
    default_token: Option<&str>,
    max_attempts: u32,
) -> Result<String> {
    let message = match default_token {
        Some(_) => "Vault token (Enter for the dev root token): ".to_string(),
        None => "Vault token: ".to_string(),
    };

    let mut state = TokenState::AwaitingInput { attempt: 1 };
    loop {
        state = match state {
            TokenState::AwaitingInput { attempt } => {
                let input = prompt.prompt(&message)?;
                let input = input.trim();
                let token = if input.is_empty() {
                    default_token.unwrap_or_default()
                } else {
                    input
                };
                TokenState::Probing {
                    attempt,
                    token: token.to_string(),
                }
            }
            TokenState::Probing { attempt, token } => {
                let accepted = !token.is_empty() && api.lookup_self(&token).await?;
                if accepted {
                    TokenState::Valid(token)
                } else if attempt >= max_attempts {
                    TokenState::Exhausted { attempts: attempt }
                } else {
                    reporter.advisory(&format!(
                        "Token rejected ({}/{}), try again",
                        attempt, max_attempts
                    ));
                    TokenState::AwaitingInput {
                        attempt: attempt + 1,
                    }
                }
            }
            TokenState::Valid(token) => {
                api.set_token(&token);
                reporter.info("Vault token accepted");
                return Ok(token);
            }
            TokenState::Exhausted { attempts } => {
                return Err(LabError::AuthExhausted { attempts });
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryVault;
    use cloudlab_core::testing::{RecordingReporter, ScriptedPrompt};

    #[tokio::test]
    async fn test_default_token_on_empty_input() {
        let vault = InMemoryVault::new();
        let prompt = ScriptedPrompt::new([""]);
        let reporter = RecordingReporter::new();

        let token = acquire_token(&vault, &prompt, &reporter, Some("root"), 3)
            .await
            .unwrap();
        assert_eq!(token, "root");
        assert_eq!(vault.lookup_calls(), 1);
        assert!(vault.list_mounts().await.is_ok());
    }

    /// The fourth scripted answer is never read
    #[tokio::test]
    async fn test_exhaustion_never_probes_a_fourth_time() {
        let vault = InMemoryVault::new();
        let prompt = ScriptedPrompt::new(["bad-1", "bad-2", "bad-3", "root"]);
        let reporter = RecordingReporter::new();

        let err = acquire_token(&vault, &prompt, &reporter, Some("root"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::AuthExhausted { attempts: 3 }));
        assert_eq!(vault.lookup_calls(), 3);
        assert_eq!(prompt.asked().len(), 3);
    }

    #[tokio::test]
    async fn test_recovers_on_second_attempt() {
        let vault = InMemoryVault::new().with_token("s.operator");
        let prompt = ScriptedPrompt::new(["wrong", "s.operator"]);
        let reporter = RecordingReporter::new();

        let token = acquire_token(&vault, &prompt, &reporter, None, 3)
            .await
            .unwrap();
        assert_eq!(token, "s.operator");
        assert_eq!(
            reporter.with_severity(cloudlab_core::Severity::Advisory).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_input_without_default_is_a_failed_attempt() {
        let vault = InMemoryVault::new();
        let prompt = ScriptedPrompt::new(Vec::<String>::new());
        let reporter = RecordingReporter::new();

        let err = acquire_token(&vault, &prompt, &reporter, None, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::AuthExhausted { attempts: 3 }));
        assert_eq!(vault.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_aborts_immediately() {
        let vault = InMemoryVault::unreachable();
        let prompt = ScriptedPrompt::new(["root", "root", "root"]);
        let reporter = RecordingReporter::new();

        let err = acquire_token(&vault, &prompt, &reporter, None, 3)
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(prompt.asked().len(), 1);
    }
}

//! In-memory session for one prompt-to-mint interaction.
//!
//! The lifecycle is a single tagged state rather than independent flags, so
//! "generating while minting" and similar combinations cannot be expressed:
//!
//! `Idle -> Generating -> Previewing -> Minting -> Minted`
//!
//! `Generating` falls back to `Idle` and `Minting` falls back to `Previewing`
//! on failure. `Previewing` returns to `Idle` on reset. `Minted` only ends
//! with a fresh session.

use std::path::PathBuf;

use crate::error::{
    ValidationError, WorkflowError, MIN_DESCRIPTION_CHARS, MIN_NAME_CHARS, MIN_PROMPT_CHARS,
    MIN_RECIPIENT_CHARS,
};
use crate::mint::{MintForm, MintReceipt};

/// An image returned by the inference service plus its local preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub preview_path: PathBuf,
    pub preview_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Generating,
    Previewing(GeneratedImage),
    Minting(GeneratedImage),
    Minted(MintReceipt),
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Generating => "generating",
            SessionState::Previewing(_) => "previewing",
            SessionState::Minting(_) => "minting",
            SessionState::Minted(_) => "minted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    prompt: String,
    form: MintForm,
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: String::new(),
            form: MintForm::default(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn form(&self) -> &MintForm {
        &self.form
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = description.into();
    }

    pub fn set_recipient_address(&mut self, address: impl Into<String>) {
        self.form.recipient_address = address.into();
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        match &self.state {
            SessionState::Previewing(image) | SessionState::Minting(image) => Some(image),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<&MintReceipt> {
        match &self.state {
            SessionState::Minted(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn is_generating(&self) -> bool {
        matches!(self.state, SessionState::Generating)
    }

    pub fn is_minting(&self) -> bool {
        matches!(self.state, SessionState::Minting(_))
    }

    pub fn minted(&self) -> bool {
        matches!(self.state, SessionState::Minted(_))
    }

    /// Validate the prompt and move `Idle -> Generating`.
    ///
    /// Returns the trimmed prompt to send upstream.
    pub fn begin_generation(&mut self, prompt: &str) -> Result<String, WorkflowError> {
        validate_prompt(prompt)?;
        self.require(matches!(self.state, SessionState::Idle), "generate")?;
        self.prompt = prompt.trim().to_string();
        self.state = SessionState::Generating;
        Ok(self.prompt.clone())
    }

    pub fn finish_generation(&mut self, image: GeneratedImage) -> Result<(), WorkflowError> {
        self.require(self.is_generating(), "finish generating")?;
        self.state = SessionState::Previewing(image);
        Ok(())
    }

    /// Drop back to `Idle` so the front end is never left locked.
    pub fn fail_generation(&mut self) {
        if self.is_generating() {
            self.state = SessionState::Idle;
        }
    }

    /// Validate the form and move `Previewing -> Minting`.
    ///
    /// The form is stored even when the state check fails so the user does
    /// not have to re-enter it.
    pub fn begin_minting(&mut self, form: MintForm) -> Result<(), WorkflowError> {
        validate_mint_form(&form)?;
        self.form = form;
        match std::mem::take(&mut self.state) {
            SessionState::Previewing(image) => {
                self.state = SessionState::Minting(image);
                Ok(())
            }
            other => {
                let state = other.label();
                self.state = other;
                Err(WorkflowError::InvalidState {
                    action: "mint",
                    state,
                })
            }
        }
    }

    /// Move `Minting -> Minted`, clearing the prompt.
    ///
    /// Returns the image that was minted so the caller can release its
    /// preview.
    pub fn finish_minting(&mut self, receipt: MintReceipt) -> Result<GeneratedImage, WorkflowError> {
        match std::mem::take(&mut self.state) {
            SessionState::Minting(image) => {
                self.state = SessionState::Minted(receipt);
                self.prompt.clear();
                Ok(image)
            }
            other => {
                let state = other.label();
                self.state = other;
                Err(WorkflowError::InvalidState {
                    action: "finish minting",
                    state,
                })
            }
        }
    }

    /// Return to `Previewing` with image and form intact.
    pub fn fail_minting(&mut self) {
        match std::mem::take(&mut self.state) {
            SessionState::Minting(image) => self.state = SessionState::Previewing(image),
            other => self.state = other,
        }
    }

    /// Clear the generated image and prompt. `Minted` is kept.
    pub fn reset(&mut self) -> Result<Option<GeneratedImage>, WorkflowError> {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => {
                self.prompt.clear();
                Ok(None)
            }
            SessionState::Previewing(image) => {
                self.prompt.clear();
                Ok(Some(image))
            }
            SessionState::Minted(receipt) => {
                self.prompt.clear();
                self.state = SessionState::Minted(receipt);
                Ok(None)
            }
            other => {
                let state = other.label();
                self.state = other;
                Err(WorkflowError::InvalidState {
                    action: "reset",
                    state,
                })
            }
        }
    }

    fn require(&self, ok: bool, action: &'static str) -> Result<(), WorkflowError> {
        if ok {
            return Ok(());
        }
        Err(WorkflowError::InvalidState {
            action,
            state: self.state.label(),
        })
    }
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if char_len(prompt) < MIN_PROMPT_CHARS {
        return Err(ValidationError::PromptTooShort);
    }
    Ok(())
}

/// Plausibility checks only; the address is not parsed.
pub fn validate_mint_form(form: &MintForm) -> Result<(), ValidationError> {
    if char_len(&form.name) < MIN_NAME_CHARS {
        return Err(ValidationError::NameTooShort);
    }
    if char_len(&form.description) < MIN_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooShort);
    }
    if char_len(&form.recipient_address) < MIN_RECIPIENT_CHARS {
        return Err(ValidationError::RecipientTooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{validate_mint_form, validate_prompt, GeneratedImage, Session, SessionState};
    use crate::error::{ValidationError, WorkflowError};
    use crate::mint::{MintForm, MintReceipt};

    fn image() -> GeneratedImage {
        GeneratedImage {
            bytes: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
            preview_path: PathBuf::from("/tmp/artifact.png"),
            preview_url: "file:///tmp/artifact.png".to_string(),
        }
    }

    fn form() -> MintForm {
        MintForm::new("Sunset", "A red sunset", "0x627306090abaB3A6e1400e9345bC60c78a8BEf57")
    }

    fn receipt() -> MintReceipt {
        MintReceipt {
            chain: "polygon".to_string(),
            file_url: "https://ipfs.io/ipfs/cid".to_string(),
            mint_to_address: "0x627306090abaB3A6e1400e9345bC60c78a8BEf57".to_string(),
            transaction_hash: Some("0xabc".to_string()),
            transaction_external_url: None,
        }
    }

    fn previewing() -> Session {
        let mut session = Session::with_id("s-1");
        session.begin_generation("a red sunset").unwrap();
        session.finish_generation(image()).unwrap();
        session
    }

    #[test]
    fn prompt_shorter_than_three_chars_is_rejected() {
        for prompt in ["", "a", "ab", "  ab  ", "é"] {
            assert_eq!(validate_prompt(prompt), Err(ValidationError::PromptTooShort));
        }
        assert_eq!(validate_prompt("abc"), Ok(()));
        assert_eq!(validate_prompt("日本語"), Ok(()));
    }

    #[test]
    fn mint_form_reports_first_violation() {
        let mut bad = form();
        bad.name = "ab".to_string();
        assert_eq!(validate_mint_form(&bad), Err(ValidationError::NameTooShort));

        let mut bad = form();
        bad.description = "abcd".to_string();
        assert_eq!(
            validate_mint_form(&bad),
            Err(ValidationError::DescriptionTooShort)
        );

        let mut bad = form();
        bad.recipient_address = "0x1234".to_string();
        assert_eq!(
            validate_mint_form(&bad),
            Err(ValidationError::RecipientTooShort)
        );

        assert_eq!(validate_mint_form(&form()), Ok(()));
    }

    #[test]
    fn generation_failure_returns_to_idle() {
        let mut session = Session::with_id("s-1");
        let prompt = session.begin_generation("  a red sunset ").unwrap();
        assert_eq!(prompt, "a red sunset");
        assert!(session.is_generating());

        session.fail_generation();
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(!session.is_generating());
        assert_eq!(session.prompt(), "a red sunset");
    }

    #[test]
    fn generate_requires_idle() {
        let mut session = previewing();
        let err = session.begin_generation("another prompt").unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidState {
                action: "generate",
                state: "previewing",
            }
        );
        assert!(session.image().is_some());
    }

    #[test]
    fn mint_requires_previewing_but_keeps_form() {
        let mut session = Session::with_id("s-1");
        let err = session.begin_minting(form()).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidState {
                action: "mint",
                state: "idle",
            }
        );
        assert_eq!(session.form(), &form());
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn mint_failure_returns_to_previewing() {
        let mut session = previewing();
        session.begin_minting(form()).unwrap();
        assert!(session.is_minting());
        assert!(session.image().is_some());

        session.fail_minting();
        assert_eq!(session.state(), &SessionState::Previewing(image()));
        assert_eq!(session.form(), &form());
        assert_eq!(session.prompt(), "a red sunset");
    }

    #[test]
    fn mint_success_clears_prompt_and_image() {
        let mut session = previewing();
        session.begin_minting(form()).unwrap();
        let released = session.finish_minting(receipt()).unwrap();
        assert_eq!(released, image());
        assert!(session.minted());
        assert_eq!(session.prompt(), "");
        assert!(session.image().is_none());
        assert_eq!(session.receipt(), Some(&receipt()));
    }

    #[test]
    fn minted_is_terminal() {
        let mut session = previewing();
        session.begin_minting(form()).unwrap();
        session.finish_minting(receipt()).unwrap();

        assert!(session.begin_generation("next prompt").is_err());
        assert!(session.begin_minting(form()).is_err());
        assert!(session.minted());
    }

    #[test]
    fn reset_clears_preview_but_never_minted() {
        let mut session = previewing();
        let released = session.reset().unwrap();
        assert_eq!(released, Some(image()));
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.prompt(), "");

        let mut session = previewing();
        session.begin_minting(form()).unwrap();
        session.finish_minting(receipt()).unwrap();
        assert_eq!(session.reset().unwrap(), None);
        assert!(session.minted());
    }

    #[test]
    fn reset_is_rejected_mid_flight() {
        let mut session = Session::with_id("s-1");
        session.begin_generation("a red sunset").unwrap();
        assert!(session.reset().is_err());
        assert!(session.is_generating());
    }

    #[test]
    fn new_sessions_get_distinct_ids() {
        assert_ne!(Session::new().id(), Session::new().id());
    }
}

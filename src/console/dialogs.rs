//! Dialogs answered on the console.
//!
//! Questions are queued for the loop runner, which prints them one at a
//! time and treats the next typed line as the answer.

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};

use super::input::is_yes;
use crate::app::Dialogs;
use crate::trust::CertificatePrompt;

#[derive(Debug)]
pub struct Question {
    pub text: String,
    pub reply: oneshot::Sender<String>,
}

pub struct ConsoleDialogs {
    questions: mpsc::UnboundedSender<Question>,
}

impl ConsoleDialogs {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Question>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { questions: tx }, rx)
    }

    /// Queue `text`; resolves to the typed answer, or `None` if the loop
    /// went away first.
    fn ask(&self, text: String) -> BoxFuture<'static, Option<String>> {
        let (reply, answer) = oneshot::channel();
        if self.questions.send(Question { text, reply }).is_err() {
            return futures::future::ready(None).boxed();
        }
        async move { answer.await.ok() }.boxed()
    }

    fn confirm(&self, text: String) -> BoxFuture<'static, bool> {
        let answer = self.ask(text);
        async move { answer.await.is_some_and(|a| is_yes(&a)) }.boxed()
    }
}

impl Dialogs for ConsoleDialogs {
    fn confirm_add_host(&self, url: &str) -> BoxFuture<'static, bool> {
        self.confirm(format!("Add {} to your servers? [y/N]", url))
    }

    fn confirm_certificate(&self, prompt: &CertificatePrompt) -> BoxFuture<'static, bool> {
        let mut text = format!(
            "Certificate error for {}: {}\nIssuer: {}\n",
            prompt.url, prompt.error, prompt.certificate.issuer_name
        );
        if prompt.replaces_existing {
            text.push_str("WARNING: this differs from the certificate you trusted before.\n");
        }
        text.push_str("Trust this certificate? [y/N]");
        self.confirm(text)
    }

    fn confirm_reset(&self) -> BoxFuture<'static, bool> {
        self.confirm(
            "This will sign you out from all your teams and reset the app back to its \
             original settings. This cannot be undone. Continue? [y/N]"
                .to_string(),
        )
    }

    fn select_screenshare_source(&self) -> BoxFuture<'static, Option<String>> {
        let answer = self.ask("Screen to share (source id, empty to cancel):".to_string());
        async move {
            answer
                .await
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
        }
        .boxed()
    }

    fn alert(&self, title: &str, message: &str) {
        println!("! {}: {}", title, message);
    }

    fn about(&self, product_name: &str) {
        println!(
            "{} {} ({})",
            product_name,
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_NAME")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::Certificate;

    #[tokio::test]
    async fn test_confirm_reads_answer() {
        let (dialogs, mut questions) = ConsoleDialogs::new();
        let answer = dialogs.confirm_add_host("https://chat.example.com");

        let question = questions.recv().await.unwrap();
        assert!(question.text.contains("https://chat.example.com"));
        question.reply.send("y".into()).unwrap();
        assert!(answer.await);
    }

    #[tokio::test]
    async fn test_dropped_question_is_no() {
        let (dialogs, mut questions) = ConsoleDialogs::new();
        let answer = dialogs.confirm_reset();
        drop(questions.recv().await.unwrap());
        assert!(!answer.await);
    }

    #[tokio::test]
    async fn test_certificate_prompt_mentions_replacement() {
        let (dialogs, mut questions) = ConsoleDialogs::new();
        let prompt = CertificatePrompt {
            url: "https://chat.example.com".into(),
            error: "net::ERR_CERT_AUTHORITY_INVALID".into(),
            certificate: Certificate::new("Acme CA", "PEM"),
            replaces_existing: true,
        };
        let answer = dialogs.confirm_certificate(&prompt);
        let question = questions.recv().await.unwrap();
        assert!(question.text.contains("Acme CA"));
        assert!(question.text.contains("differs"));
        question.reply.send("no".into()).unwrap();
        assert!(!answer.await);
    }

    #[tokio::test]
    async fn test_empty_screenshare_answer_cancels() {
        let (dialogs, mut questions) = ConsoleDialogs::new();
        let answer = dialogs.select_screenshare_source();
        questions.recv().await.unwrap().reply.send("  ".into()).unwrap();
        assert_eq!(answer.await, None);
    }
}

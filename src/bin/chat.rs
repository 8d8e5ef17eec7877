use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use envlaw_assistant::client::{
    ChatClient, ChatMessage, ClientError, Conversation, ConversationError, ConversationView,
    MessageRole,
};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/chat";

/// Prints the streaming assistant message incrementally. Buffers only grow,
/// so the already-printed lengths are always valid char boundaries.
#[derive(Default)]
struct TerminalView {
    current: Option<Uuid>,
    printed_reasoning: usize,
    printed_content: usize,
}

impl ConversationView for TerminalView {
    fn message_updated(&mut self, message: &ChatMessage) {
        if message.role == MessageRole::User {
            return;
        }

        let mut out = std::io::stdout().lock();
        if self.current != Some(message.id) {
            self.current = Some(message.id);
            self.printed_reasoning = 0;
            self.printed_content = 0;
            let _ = write!(out, "\n🤖 ");
        }

        let reasoning = message.reasoning();
        if reasoning.len() > self.printed_reasoning {
            if self.printed_reasoning == 0 {
                let _ = writeln!(out, "Reasoning Chain:");
            }
            let _ = write!(out, "\x1b[2m{}\x1b[0m", &reasoning[self.printed_reasoning..]);
            self.printed_reasoning = reasoning.len();
        }

        if message.content.len() > self.printed_content {
            if self.printed_content == 0 && self.printed_reasoning > 0 {
                let _ = write!(out, "\n\n");
            }
            let _ = write!(out, "{}", &message.content[self.printed_content..]);
            self.printed_content = message.content.len();
        }
        let _ = out.flush();
    }

    fn message_removed(&mut self, id: Uuid) {
        if self.current == Some(id) {
            println!("\n[answer discarded]");
            self.current = None;
        }
    }

    fn error_shown(&mut self, error: &str) {
        eprintln!("⚠️  {}", error);
    }

    fn busy_changed(&mut self, busy: bool) {
        if !busy {
            println!();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let endpoint = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CHAT_ENDPOINT").ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let client = ChatClient::new(endpoint.clone());
    let mut conversation = Conversation::new();
    let mut view = TerminalView::default();

    println!("环保法律小助手 · {}", endpoint);
    println!("Type a question, or /quit to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" {
            break;
        }

        match client.send(&mut conversation, line, &mut view).await {
            Ok(()) => {}
            Err(ClientError::Conversation(ConversationError::EmptyInput)) => {}
            // already shown through the view
            Err(e) => log::debug!("exchange failed: {}", e),
        }
    }

    Ok(())
}

//! Interactive assessment wizard CLI.
//!
//! Runs the wizard context (engine + coordinator + avatar) and a separate
//! chat context on the same in-process page channel, then drives both from
//! a line-based prompt. Guidance and status updates arriving on the chat
//! side are printed as they come in.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;

use compliance_wizard::avatar::Avatar;
use compliance_wizard::bus::{
    CrossTabTransport, MessageBus, MessageEnvelope, MessageHandler, MessageType, PageChannel,
    SamePageTransport, SendOptions, Transport,
};
use compliance_wizard::catalog::{FrameworkCatalog, builtin_frameworks};
use compliance_wizard::config::WizardConfig;
use compliance_wizard::coordinator::IntegrationCoordinator;
use compliance_wizard::error::Error;
use compliance_wizard::store::{FileStore, MemoryStore, SessionStore};
use compliance_wizard::wizard::{StepOutcome, WizardEngine};

const DEFAULT_QUESTIONNAIRES: &str = include_str!("../data/questionnaires.json");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("compliance_wizard=info")),
        )
        .init();

    let raw = match std::env::var("WIZARD_QUESTIONNAIRES") {
        Ok(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading questionnaire file {path}"))?,
        Err(_) => DEFAULT_QUESTIONNAIRES.to_string(),
    };
    let data: serde_json::Value =
        serde_json::from_str(&raw).context("parsing questionnaire JSON")?;
    let catalog = FrameworkCatalog::from_question_data(&builtin_frameworks(), &data);

    let store: Arc<dyn SessionStore> = match std::env::var("WIZARD_STATE_FILE") {
        Ok(path) => {
            tracing::info!(path, "using file-backed session store");
            Arc::new(FileStore::open(&path).await.context("opening state file")?)
        }
        Err(_) => Arc::new(MemoryStore::new()),
    };

    let config = WizardConfig::default();
    let page = PageChannel::new();

    // Wizard context: engine, coordinator, avatar.
    let engine = Arc::new(RwLock::new(WizardEngine::new(
        catalog,
        Arc::clone(&store),
        config.clone(),
    )));
    let wizard_bus = Arc::new(MessageBus::new(
        "wizard",
        vec![
            Arc::new(SamePageTransport::new(&page)) as Arc<dyn Transport>,
            Arc::new(CrossTabTransport::new(
                Arc::clone(&store),
                config.cross_tab_ttl,
            )) as Arc<dyn Transport>,
        ],
    ));
    wizard_bus.start();
    let avatar = Arc::new(Avatar::new(config.concerned_hold));
    let coordinator = Arc::new(IntegrationCoordinator::new(
        Arc::clone(&engine),
        Arc::clone(&wizard_bus),
        avatar,
        config.clone(),
    ));
    coordinator.start().await;

    // Chat context: prints what the wizard side publishes.
    let chat_bus = Arc::new(MessageBus::new(
        "chat-cli",
        vec![Arc::new(SamePageTransport::new(&page)) as Arc<dyn Transport>],
    ));
    chat_bus.start();
    let printer: Arc<dyn MessageHandler> = Arc::new(ChatPrinter);
    for kind in [
        MessageType::FrameworkSelected,
        MessageType::StepChanged,
        MessageType::ProgressUpdated,
        MessageType::AnswerSaved,
        MessageType::ValidationError,
        MessageType::AssessmentComplete,
        MessageType::StatusUpdate,
        MessageType::ErrorNotification,
        MessageType::ContextSync,
    ] {
        chat_bus.register_handler(kind, Arc::clone(&printer)).await;
    }

    println!("Compliance assessment wizard. Type 'commands' for a list, 'quit' to exit.");
    repl(engine, wizard_bus, chat_bus).await?;
    Ok(())
}

async fn repl(
    engine: Arc<RwLock<WizardEngine>>,
    wizard_bus: Arc<MessageBus>,
    chat_bus: Arc<MessageBus>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        match command {
            "" => {}
            "quit" | "exit" => break,
            "commands" => print_commands(),
            "frameworks" => {
                let engine = engine.read().await;
                for fw in engine.catalog().iter() {
                    println!(
                        "  {:<16} {} ({} steps, {} questions)",
                        fw.id,
                        fw.name,
                        fw.total_steps(),
                        fw.total_questions()
                    );
                }
            }
            "select" => {
                if let Err(e) = engine.write().await.select_framework(rest) {
                    println!("  {e}");
                }
            }
            "status" => {
                let state = engine.read().await.context_state();
                println!(
                    "  {} | step {}/{} | {:.1}% | {}/{} answered",
                    state.framework_name.as_deref().unwrap_or("no framework"),
                    state.current_step,
                    state.total_steps,
                    state.progress,
                    state.answered_questions,
                    state.total_questions
                );
                if let Some(info) = engine.read().await.current_step_info() {
                    println!("  Current step: {} - {}", info.title, info.description);
                    for id in &info.question_ids {
                        println!("    {id}");
                    }
                }
            }
            "answer" => {
                let Some((qid, text)) = rest.split_once(' ') else {
                    println!("  usage: answer <question-id> <text>");
                    continue;
                };
                match engine.write().await.save_answer(qid, text.trim()).await {
                    Ok(percent) => {
                        println!("  Saved. Progress {percent:.1}%");
                        wizard_bus
                            .send(
                                MessageType::AnswerSaved,
                                serde_json::json!({"question_id": qid}),
                                SendOptions::default(),
                            )
                            .await;
                    }
                    Err(e) => println!("  {e}"),
                }
            }
            "next" => match engine.write().await.next_step(false).await {
                Ok(StepOutcome::Advanced { step, .. }) => println!("  Now on step {step}."),
                Ok(StepOutcome::Blocked { issues }) => {
                    for issue in issues.iter().filter(|i| i.blocking) {
                        println!("  {}: {}", issue.question_id, issue.message);
                    }
                }
                Ok(StepOutcome::Completed(results)) => {
                    println!(
                        "  Done! {} of {} questions answered.",
                        results.answered_questions, results.total_questions
                    );
                }
                Err(e) => println!("  {e}"),
            },
            "back" => {
                if !engine.write().await.previous_step() {
                    println!("  Already at the first step.");
                }
            }
            "goto" => match rest.parse::<u32>() {
                Ok(step) => {
                    if let Err(e) = engine.write().await.go_to_step(step, false) {
                        println!("  {e}");
                    }
                }
                Err(_) => println!("  usage: goto <step-number>"),
            },
            "save" => match engine.write().await.save_progress().await {
                Ok(()) => println!("  Progress saved."),
                Err(e) => println!("  {e}"),
            },
            "load" => {
                let id = if rest.is_empty() { None } else { Some(rest) };
                match engine.write().await.load_progress(id).await {
                    Ok(true) => println!("  Progress restored."),
                    Ok(false) => println!("  No saved progress found."),
                    Err(e) => println!("  {e}"),
                }
            }
            "clear" => {
                let id = if rest.is_empty() { None } else { Some(rest) };
                match engine.write().await.clear_progress(id).await {
                    Ok(()) => println!("  Saved progress cleared."),
                    Err(e) => println!("  {e}"),
                }
            }
            "help" => {
                let data = if rest.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::json!({"topic": rest})
                };
                chat_bus
                    .send(MessageType::HelpRequest, data, SendOptions::default())
                    .await;
                settle().await;
            }
            "explain" => {
                chat_bus
                    .send(
                        MessageType::ExplanationRequest,
                        serde_json::json!({"concept": rest}),
                        SendOptions::default(),
                    )
                    .await;
                settle().await;
            }
            "say" => {
                chat_bus
                    .send(
                        MessageType::VoiceInput,
                        serde_json::json!({"transcript": rest}),
                        SendOptions::default(),
                    )
                    .await;
                settle().await;
            }
            other => println!("  Unknown command '{other}'. Type 'commands' for a list."),
        }
    }
    Ok(())
}

/// Give in-flight bus traffic a moment to land before the next prompt.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

fn print_commands() {
    println!(
        "  frameworks              list available frameworks\n  \
         select <id>             start an assessment\n  \
         status                  show session state and current step\n  \
         answer <qid> <text>     record an answer\n  \
         next / back / goto <n>  navigate\n  \
         save / load [id]        persist or restore progress\n  \
         clear [id]              drop saved progress\n  \
         help [topic]            ask the collaborator for help\n  \
         explain <concept>       ask for an explanation\n  \
         say <text>              send a voice-style transcript\n  \
         quit                    exit"
    );
}

/// Chat-side handler: renders wizard traffic to stdout.
struct ChatPrinter;

#[async_trait]
impl MessageHandler for ChatPrinter {
    async fn handle(&self, envelope: MessageEnvelope) -> Result<(), Error> {
        match envelope.kind {
            MessageType::FrameworkSelected
            | MessageType::StepChanged
            | MessageType::AssessmentComplete => {
                if let Some(text) = envelope.data.get("guidance").and_then(|v| v.as_str()) {
                    println!("\n[assistant] {text}");
                }
            }
            MessageType::StatusUpdate => {
                if let Some(text) = envelope.data.get("message").and_then(|v| v.as_str()) {
                    println!("\n[assistant] {text}");
                }
            }
            MessageType::ValidationError => {
                println!("\n[assistant] Some answers on this step need attention.");
            }
            MessageType::ErrorNotification => {
                if let Some(text) = envelope.data.get("message").and_then(|v| v.as_str()) {
                    println!("\n[assistant] Something went wrong: {text}");
                }
            }
            // Progress, answers, and sync traffic stay quiet on the CLI.
            _ => {}
        }
        Ok(())
    }
}

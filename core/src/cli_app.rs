use crate::attachment::FsPicker;
use crate::chat_types::{ChatEvent, ConversationSnapshot, MimeKind};
use crate::config::LaunchOptions;
use crate::error::ChatError;
use crate::participant_directory::InMemoryDirectory;
use crate::session::{AttachOutcome, ChatService, ConversationSession};
use crate::view::{self, FormatOptions, RenderItem};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Attach(MimeKind, Option<PathBuf>),
    Refresh,
    Read,
    History,
    Conversations,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let path = (!rest.is_empty()).then(|| PathBuf::from(rest));

    match head {
        "/quit" | "/exit" => Command::Quit,
        "/help" => Command::Help,
        "/refresh" => Command::Refresh,
        "/read" => Command::Read,
        "/history" => Command::History,
        "/list" => Command::Conversations,
        "/image" => Command::Attach(MimeKind::Image, path),
        "/file" => Command::Attach(MimeKind::File, path),
        _ => Command::Send(line.to_string()),
    }
}

/// Interactive conversation on stdin/stdout against the demo roster
pub async fn run(options: LaunchOptions) -> anyhow::Result<()> {
    let directory = InMemoryDirectory::demo(chrono::Utc::now());
    let format_options = FormatOptions::local(options.chat.clock_style);
    let service = ChatService::new(Arc::new(directory), options.chat)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let events = service.subscribe();
    let session = match service.open(&options.participant_id).await {
        Ok(session) => session,
        Err(ChatError::NotFound(id)) => {
            eprintln!("{} Unknown participant: {}", "✗".red().bold(), id.red());
            eprintln!(
                "  Try one of: {}",
                "sarah-johnson, david-chen, maria-lopez".cyan()
            );
            return Ok(());
        }
        Err(e) => return Err(anyhow::anyhow!("Open error: {}", e)),
    };

    print_header(&session.snapshot());
    print_transcript(&session.snapshot(), &format_options);
    print_usage();

    let printer = tokio::spawn(print_events(events, format_options));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Quit => break,
            Command::Empty => {}
            Command::Help => print_usage(),
            Command::History => print_transcript(&session.snapshot(), &format_options),
            Command::Conversations => {
                for summary in service.conversations().await {
                    println!(
                        "  {} {} {}",
                        summary.display_name.cyan(),
                        format!("({} unread)", summary.unread_count).dimmed(),
                        summary.last_preview
                    );
                }
            }
            Command::Read => match session.mark_all_remote_read().await {
                Ok(ids) => println!("{} {} marked read", "✓".green(), ids.len()),
                Err(e) => print_error(&e),
            },
            Command::Refresh => {
                println!("{}", "Refreshing...".dimmed());
                if let Err(e) = session.refresh().await {
                    print_error(&e);
                }
            }
            Command::Attach(kind, path) => attach(&session, kind, path).await,
            Command::Send(text) => {
                if let Err(e) = session.send(&text).await {
                    print_error(&e);
                }
            }
        }
    }

    service.close_all().await;
    printer.abort();
    println!("{}", "Bye!".bright_cyan());
    Ok(())
}

async fn attach(session: &ConversationSession, kind: MimeKind, path: Option<PathBuf>) {
    let picker = FsPicker::new(path);
    match session.attach_from(&picker, kind).await {
        Ok(AttachOutcome::Sent(_)) => {}
        Ok(AttachOutcome::Cancelled) => println!("{}", "Attachment cancelled".dimmed()),
        Err(ChatError::PermissionDenied) => eprintln!(
            "{} Permission denied. Allow file access and try again.",
            "✗".red().bold()
        ),
        Err(e) => print_error(&e),
    }
}

async fn print_events(mut events: broadcast::Receiver<ChatEvent>, options: FormatOptions) {
    loop {
        match events.recv().await {
            Ok(ChatEvent::MessageAdded { message, at_head, .. }) => {
                for group in view::format(std::slice::from_ref(&message), &options) {
                    for item in &group.items {
                        let marker = if at_head { "↑ " } else { "" };
                        println!("{}{}", marker.dimmed(), render_line(item));
                    }
                }
            }
            Ok(ChatEvent::TypingChanged { is_typing: true, .. }) => {
                println!("{}", "  ... typing".dimmed().italic());
            }
            Ok(ChatEvent::MessagesRead { message_ids, .. }) => {
                println!("{}", format!("  {} messages read", message_ids.len()).dimmed());
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Terminal printer lagged {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_header(snapshot: &ConversationSnapshot) {
    let who = &snapshot.participant;
    let presence = if who.is_online {
        "● Online".green()
    } else {
        who.last_seen_label.as_str().dimmed()
    };
    println!(
        "{}",
        "╭─ Conversation ─────────────────────────────────────────────╮".bright_cyan()
    );
    println!("{} {} {}", "│".bright_cyan(), who.display_name.bright_white().bold(), presence);
    println!(
        "{}",
        "╰────────────────────────────────────────────────────────────╯".bright_cyan()
    );
}

fn print_transcript(snapshot: &ConversationSnapshot, options: &FormatOptions) {
    let groups = view::format_snapshot(snapshot, options);
    if groups.is_empty() {
        println!("{}", "No messages yet. Say hello!".yellow());
    }
    for group in groups {
        println!("{}", format!("── {} ──", group.header).dimmed());
        for item in &group.items {
            println!("{}", render_line(item));
        }
    }
    if snapshot.unread_count() > 0 {
        println!(
            "{}",
            format!("{} unread, type /read to mark them", snapshot.unread_count()).yellow()
        );
    }
}

fn render_line(item: &RenderItem) -> String {
    let time = item.time_label.dimmed();
    if item.originated_locally {
        let receipt = match item.receipt {
            Some(view::ReadReceipt::Read) => "✓✓".green(),
            _ => "✓".dimmed(),
        };
        format!("  {} {} {} {}", time, "you:".cyan().bold(), item.body, receipt)
    } else {
        format!("  {} {} {}", time, "them:".magenta().bold(), item.body)
    }
}

fn print_usage() {
    println!("{}", "Commands:".bright_white().bold());
    println!("  {}        Send a message", "<text>".cyan());
    println!("  {}  Attach an image", "/image <path>".cyan());
    println!("  {}   Attach a document", "/file <path>".cyan());
    println!("  {}       Pull in new messages", "/refresh".cyan());
    println!("  {}          Mark incoming messages read", "/read".cyan());
    println!("  {}       Reprint the conversation", "/history".cyan());
    println!("  {}          List open conversations", "/list".cyan());
    println!("  {}          Leave", "/quit".cyan());
}

fn print_error(e: &ChatError) {
    if e.is_recoverable() {
        eprintln!("{} {}", "!".yellow().bold(), e.to_string().yellow());
    } else {
        eprintln!("{} {}", "✗".red().bold(), e.to_string().red());
    }
}

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::{eyre::bail, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use fieldlink::api::{CachedApiClient, HandlerInput, MessageInput, RecordId};
use fieldlink::config::Config;
use fieldlink::logging;
use fieldlink::session::{SessionCache, SqliteStore, UserRecord};

#[derive(Parser, Debug)]
#[command(name = "fieldlink")]
#[command(about = "Command-line access to the field operations backend")]
#[command(version)]
struct Cli {
  /// Path to config file (default: $XDG_CONFIG_HOME/fieldlink/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Logistics and complaints handlers
  #[command(subcommand)]
  Handlers(HandlerCommand),
  /// Chat and request messages
  #[command(subcommand)]
  Messages(MessageCommand),
  /// The locally stored signed-in user
  #[command(subcommand)]
  Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
enum HandlerCommand {
  List,
  Logistics,
  Complaints,
  Create(HandlerArgs),
  Update {
    id: RecordId,
    #[command(flatten)]
    fields: HandlerArgs,
  },
  Delete {
    id: RecordId,
  },
}

#[derive(Args, Debug)]
struct HandlerArgs {
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  role: Option<String>,
  #[arg(long)]
  email: Option<String>,
  #[arg(long)]
  phone: Option<String>,
}

impl From<HandlerArgs> for HandlerInput {
  fn from(args: HandlerArgs) -> Self {
    HandlerInput {
      name: args.name,
      email: args.email,
      phone: args.phone,
      role: args.role,
      ..Default::default()
    }
  }
}

#[derive(Subcommand, Debug)]
enum MessageCommand {
  List,
  Get {
    id: RecordId,
  },
  Chat {
    chat_id: RecordId,
  },
  Request {
    request_id: RecordId,
  },
  Sender {
    sender_id: RecordId,
  },
  /// Messages filtered by read flag
  Status {
    #[arg(action = ArgAction::Set)]
    is_read: bool,
  },
  UnreadChat {
    chat_id: RecordId,
  },
  UnreadRequest {
    request_id: RecordId,
  },
  /// One page of a chat, newest first
  Page {
    chat_id: RecordId,
    #[arg(long)]
    limit: Option<u32>,
    /// Cursor: only messages before this date
    #[arg(long)]
    last_date: Option<String>,
  },
  Send(MessageArgs),
  /// Change some fields of a message
  Edit {
    id: RecordId,
    #[command(flatten)]
    fields: MessageArgs,
  },
  Delete {
    id: RecordId,
  },
  Read {
    id: RecordId,
  },
  ReadChat {
    chat_id: RecordId,
  },
  ReadRequest {
    request_id: RecordId,
  },
}

#[derive(Args, Debug)]
struct MessageArgs {
  #[arg(long)]
  content: Option<String>,
  #[arg(long)]
  chat_id: Option<RecordId>,
  #[arg(long)]
  request_id: Option<RecordId>,
  #[arg(long)]
  sender_id: Option<RecordId>,
}

impl From<MessageArgs> for MessageInput {
  fn from(args: MessageArgs) -> Self {
    MessageInput {
      chat_id: args.chat_id,
      request_id: args.request_id,
      sender_id: args.sender_id,
      content: args.content,
      ..Default::default()
    }
  }
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
  Show,
  Clear,
  Set {
    #[arg(long)]
    id: RecordId,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    role: Option<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = Cli::parse();

  // Load configuration
  let config = Config::load(cli.config.as_deref())?;
  let _log_guard = logging::init_logging(&config.log)?;
  debug!(base_url = %config.api_base_url, "loaded configuration");

  match cli.command {
    Command::Handlers(command) => run_handlers(&config, command).await,
    Command::Messages(command) => run_messages(&config, command).await,
    Command::Session(command) => run_session(&config, command),
  }
}

async fn run_handlers(config: &Config, command: HandlerCommand) -> Result<()> {
  let client = CachedApiClient::new(config)?;

  match command {
    HandlerCommand::List => print_json(&*client.handlers().await?),
    HandlerCommand::Logistics => print_json(&*client.logistics_handlers().await?),
    HandlerCommand::Complaints => print_json(&*client.complaints_handlers().await?),
    HandlerCommand::Create(fields) => print_json(&client.create_handler(&fields.into()).await?),
    HandlerCommand::Update { id, fields } => {
      print_json(&client.update_handler(&id, &fields.into()).await?)
    }
    HandlerCommand::Delete { id } => print_json(&client.delete_handler(&id).await?),
  }
}

async fn run_messages(config: &Config, command: MessageCommand) -> Result<()> {
  let client = CachedApiClient::new(config)?;

  match command {
    MessageCommand::List => print_json(&*client.messages().await?),
    MessageCommand::Get { id } => print_json(&*client.message(&id).await?),
    MessageCommand::Chat { chat_id } => print_json(&*client.chat_messages(&chat_id).await?),
    MessageCommand::Request { request_id } => {
      print_json(&*client.request_messages(&request_id).await?)
    }
    MessageCommand::Sender { sender_id } => {
      print_json(&*client.sender_messages(&sender_id).await?)
    }
    MessageCommand::Status { is_read } => {
      print_json(&*client.messages_by_read_status(is_read).await?)
    }
    MessageCommand::UnreadChat { chat_id } => {
      print_json(&*client.unread_chat_messages(&chat_id).await?)
    }
    MessageCommand::UnreadRequest { request_id } => {
      print_json(&*client.unread_request_messages(&request_id).await?)
    }
    MessageCommand::Page {
      chat_id,
      limit,
      last_date,
    } => print_json(
      &*client
        .paginated_messages(&chat_id, limit, last_date.as_deref())
        .await?,
    ),
    MessageCommand::Send(fields) => print_json(&client.create_message(&fields.into()).await?),
    MessageCommand::Edit { id, fields } => {
      print_json(&client.patch_message(&id, &fields.into()).await?)
    }
    MessageCommand::Delete { id } => print_json(&client.delete_message(&id).await?),
    MessageCommand::Read { id } => print_json(&client.mark_message_as_read(&id).await?),
    MessageCommand::ReadChat { chat_id } => {
      print_json(&client.mark_all_messages_as_read_in_chat(&chat_id).await?)
    }
    MessageCommand::ReadRequest { request_id } => {
      print_json(&client.mark_all_messages_as_read_in_request(&request_id).await?)
    }
  }
}

fn run_session(config: &Config, command: SessionCommand) -> Result<()> {
  let store = SqliteStore::open(&config.session_path()?)?;
  let mut session = SessionCache::new(store);

  match command {
    SessionCommand::Show => {
      let user = session.read().cloned();
      if let Some(e) = session.error() {
        bail!("{e}");
      }
      print_json(&user)
    }
    SessionCommand::Clear => {
      session.clear();
      if let Some(e) = session.error() {
        bail!("{e}");
      }
      Ok(())
    }
    SessionCommand::Set {
      id,
      name,
      phone,
      email,
      role,
    } => {
      session.write(UserRecord {
        name,
        phone,
        email,
        role,
        ..UserRecord::new(id)
      });
      if let Some(e) = session.error() {
        bail!("{e}");
      }
      print_json(&session.user())
    }
  }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

mod aim;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use futures::{SinkExt, StreamExt};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing_subscriber::EnvFilter;

use darts_client::config::{CONFIG_FILE, ClientConfig, ConfigError};
use darts_client::controller::{Intent, JoinError, Phase, SyncController, ThrowAttempt, UiHooks};
use darts_client::net_client::{Frame, WireFormat, decode_frame, encode_frame};
use darts_client::timers::TimerKind;
use darts_core::game_state::ThrowRecord;
use darts_core::net::messages::ClientMessage;
use darts_core::notify::{Notice, NoticeLevel};
use darts_core::player::PlayerId;

use aim::{Aimer, Target};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Headless darts player: joins a game and throws whenever it is its turn.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Game to join.
    game_id: String,
    #[arg(long, default_value = "DartBot")]
    name: String,
    /// WebSocket URL; overrides `server_url` from the config file.
    #[arg(long)]
    server: Option<String>,
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Preferred zone, e.g. T20, D16, 7, BULL.
    #[arg(long, default_value = "T20")]
    target: Target,
    /// Scatter radius around the aim point, in board units.
    #[arg(long, default_value_t = 12.0)]
    jitter: f64,
    /// Pause before each throw, in milliseconds.
    #[arg(long, default_value_t = 800)]
    think_ms: u64,
    /// Send MessagePack binary frames instead of JSON text.
    #[arg(long)]
    binary: bool,
    /// Seed for the aim scatter.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug)]
enum BotError {
    Config(ConfigError),
    Join(JoinError),
    ReconnectExhausted,
}

impl std::fmt::Display for BotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Join(e) => write!(f, "cannot join: {e}"),
            Self::ReconnectExhausted => write!(f, "gave up reconnecting"),
        }
    }
}

impl std::error::Error for BotError {}

impl From<ConfigError> for BotError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<JoinError> for BotError {
    fn from(e: JoinError) -> Self {
        Self::Join(e)
    }
}

/// UI callbacks rendered as log lines.
#[derive(Debug, Default)]
struct LogHooks;

impl UiHooks for LogHooks {
    fn notify(&mut self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(text = %notice.text, "Notice"),
            NoticeLevel::Error => tracing::warn!(text = %notice.text, "Notice"),
        }
    }

    fn connection_changed(&mut self, connected: bool) {
        tracing::info!(connected, "Connection changed");
    }

    fn throw_landed(&mut self, record: &ThrowRecord, announcement: &str) {
        tracing::info!(bust = record.bust, "{announcement}");
    }

    fn game_over(&mut self, winner: Option<&PlayerId>, text: Option<&str>) {
        tracing::info!(?winner, "{}", text.unwrap_or("Game over"));
    }
}

struct Bot {
    controller: SyncController<LogHooks>,
    socket: Option<WsStream>,
    format: WireFormat,
    aimer: Aimer,
    rng: StdRng,
    think: Duration,
    next_throw: Option<Instant>,
    epoch: Instant,
}

impl Bot {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Perform every intent the controller has queued, including ones
    /// queued while handling the previous batch.
    async fn flush(&mut self) {
        loop {
            let intents = self.controller.drain_outbound();
            if intents.is_empty() {
                return;
            }
            for intent in intents {
                match intent {
                    Intent::Connect => self.connect().await,
                    Intent::Send(msg) => self.send(&msg).await,
                }
            }
        }
    }

    async fn connect(&mut self) {
        let url = self.controller.config().server_url.clone();
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::info!(%url, "Connected");
                self.socket = Some(stream);
                let now = self.now();
                self.controller.on_channel_open(now);
            },
            Err(e) => {
                tracing::warn!(%url, error = %e, "Connect failed");
                let now = self.now();
                self.controller.on_channel_closed(now);
            },
        }
    }

    async fn send(&mut self, msg: &ClientMessage) {
        let frame = match encode_frame(msg, self.format) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Encode failed");
                return;
            },
        };
        let message = match frame {
            Frame::Binary(data) => Message::Binary(data.into()),
            Frame::Text(text) => Message::Text(text.into()),
        };
        let Some(socket) = self.socket.as_mut() else {
            return;
        };
        if let Err(e) = socket.send(message).await {
            tracing::warn!(error = %e, "Send failed");
            self.channel_lost();
        }
    }

    fn channel_lost(&mut self) {
        self.socket = None;
        self.next_throw = None;
        let now = self.now();
        self.controller.on_channel_closed(now);
    }

    fn on_ws_message(&mut self, msg: Option<Result<Message, tungstenite::Error>>) {
        let frame = match msg {
            Some(Ok(Message::Binary(data))) => Frame::Binary(data.to_vec()),
            Some(Ok(Message::Text(text))) => Frame::Text(text.as_str().to_owned()),
            Some(Ok(Message::Close(_))) | None => {
                self.channel_lost();
                return;
            },
            Some(Ok(_)) => return,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "WebSocket error");
                self.channel_lost();
                return;
            },
        };
        match decode_frame(&frame) {
            Ok(msg) => {
                let now = self.now();
                self.controller.on_message(msg, now);
            },
            Err(e) => tracing::warn!(error = %e, "Dropping undecodable frame"),
        }
    }

    fn own_score(&self) -> Option<i32> {
        let id = self.controller.session().player_id()?;
        self.controller.mirror().snapshot()?.score_of(id)
    }

    fn schedule_throw(&mut self) {
        if !self.controller.is_input_accepted() {
            self.next_throw = None;
        } else if self.next_throw.is_none() {
            self.next_throw = Some(Instant::now() + self.think);
        }
    }

    fn throw_if_due(&mut self) {
        let Some(at) = self.next_throw else {
            return;
        };
        if Instant::now() < at {
            return;
        }
        self.next_throw = None;
        let point = self.aimer.pick(
            self.own_score(),
            self.controller.geometry(),
            &mut self.rng,
        );
        match self.controller.throw_at(point) {
            ThrowAttempt::Sent(hit) => tracing::info!(%hit, "Threw"),
            ThrowAttempt::Miss => tracing::info!("Missed the board"),
            ThrowAttempt::Rejected(reason) => tracing::debug!(?reason, "Throw not allowed"),
        }
    }

    /// Earliest of the controller's timers and the pending throw.
    fn wake_at(&self) -> Instant {
        let timer = self
            .controller
            .next_deadline()
            .map(|deadline| self.epoch + deadline);
        [timer, self.next_throw]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(60))
    }

    fn gave_up(&self) -> bool {
        self.controller.phase() == Phase::Disconnected
            && self.controller.reconnect_policy().is_exhausted()
            && !self.controller.timers().is_armed(TimerKind::Reconnect)
    }
}

async fn next_message(
    socket: &mut Option<WsStream>,
) -> Option<Result<Message, tungstenite::Error>> {
    match socket {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

fn build_bot(args: &Args) -> Result<Bot, BotError> {
    let mut config = ClientConfig::load(&args.config);
    if let Some(url) = &args.server {
        config.server_url = url.clone();
    }
    let controller = SyncController::new(config, LogHooks)?;
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    Ok(Bot {
        controller,
        socket: None,
        format: if args.binary {
            WireFormat::Binary
        } else {
            WireFormat::Json
        },
        aimer: Aimer::new(args.target, args.jitter),
        rng,
        think: Duration::from_millis(args.think_ms),
        next_throw: None,
        epoch: Instant::now(),
    })
}

async fn run(args: Args) -> Result<(), BotError> {
    let mut bot = build_bot(&args)?;
    let now = bot.now();
    bot.controller.connect(&args.game_id, &args.name, now)?;

    loop {
        bot.flush().await;
        if bot.controller.phase() == Phase::GameOver {
            if let Some(mut socket) = bot.socket.take() {
                let _ = socket.close(None).await;
            }
            return Ok(());
        }
        if bot.gave_up() {
            return Err(BotError::ReconnectExhausted);
        }
        bot.schedule_throw();

        let wake_at = bot.wake_at();
        tokio::select! {
            msg = next_message(&mut bot.socket) => bot.on_ws_message(msg),
            _ = tokio::time::sleep_until(wake_at) => {
                let now = bot.now();
                bot.controller.poll_timers(now);
                bot.throw_if_due();
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                return Ok(());
            },
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::info!(
        game_id = %args.game_id,
        name = %args.name,
        aim = %args.target,
        "Starting bot"
    );
    if let Err(e) = run(args).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darts_core::game_state::{HitResult, Multiplier};

    #[test]
    fn cli_defaults() {
        let args = Args::try_parse_from(["darts-bot", "game-1"]).unwrap();
        assert_eq!(args.game_id, "game-1");
        assert_eq!(args.name, "DartBot");
        assert_eq!(args.config, PathBuf::from(CONFIG_FILE));
        assert_eq!(args.target.0.multiplier(), Multiplier::Triple);
        assert!(!args.binary);
    }

    #[test]
    fn cli_overrides() {
        let args = Args::try_parse_from([
            "darts-bot",
            "g2",
            "--name",
            "Robin",
            "--server",
            "ws://example.test/ws",
            "--target",
            "dbull",
            "--jitter",
            "0",
            "--binary",
            "--seed",
            "9",
        ])
        .unwrap();
        assert_eq!(args.target.0, HitResult::DOUBLE_BULL);
        assert_eq!(args.server.as_deref(), Some("ws://example.test/ws"));
        assert_eq!(args.seed, Some(9));
        assert!(args.binary);
    }

    #[test]
    fn cli_rejects_bad_target() {
        assert!(Args::try_parse_from(["darts-bot", "g1", "--target", "T25"]).is_err());
        assert!(Args::try_parse_from(["darts-bot"]).is_err());
    }

    #[tokio::test]
    async fn bot_without_server_schedules_reconnect() {
        let args = Args::try_parse_from([
            "darts-bot",
            "g1",
            "--server",
            "ws://127.0.0.1:1/ws",
            "--config",
            "/nonexistent/darts.toml",
            "--seed",
            "1",
        ])
        .unwrap();
        let mut bot = build_bot(&args).unwrap();
        let now = bot.now();
        bot.controller.connect("g1", "Robin", now).unwrap();
        bot.flush().await;
        assert_eq!(bot.controller.phase(), Phase::Disconnected);
        assert!(bot.controller.timers().is_armed(TimerKind::Reconnect));
        assert!(!bot.gave_up());
        assert!(bot.socket.is_none());
    }
}

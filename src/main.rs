//! Narrator - 电子书逐句朗读与有声导出
//!
//! 命令行入口：
//! - segment: 查看分段结果
//! - voices: 列出远程音色
//! - export / ssml / text: 导出
//! - narrate: 交互式朗读预览
//! - config: 输出生效的配置

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast;

use narrator::application::ports::{DecisionPort, SynthesisPort};
use narrator::application::{
    ApplicationError, ExportAudio, ExportAudioHandler, ExportOutcome, ExportSsml,
    ExportSsmlHandler, ExportText, ExportTextHandler, ListVoices, ListVoicesHandler, OpenBook,
    OpenBookHandler, PlaybackHandle, PlaybackOrchestrator,
};
use narrator::config::{load_config_from_path, print_config, render_config, AppConfig, LogConfig};
use narrator::domain::book::Book;
use narrator::domain::voice::{Speed, VoiceSelection};
use narrator::infrastructure::adapters::{
    FixedDecision, HttpSynthesisClient, PacedAudioOutput, PacedSpeechDevice, PlainTextSource,
    RetryingSynthesisClient, ScriptedSynthesisClient, StdinDecisionProvider,
};
use narrator::infrastructure::events::{EventPublisher, ReaderEvent};
use narrator::infrastructure::memory::SharedUnitCache;
use narrator::infrastructure::worker::BatchPipeline;

#[derive(Debug, Parser)]
#[command(name = "narrator", version, about = "电子书逐句朗读与有声导出")]
struct Cli {
    /// 配置文件路径（默认搜索 narrator.toml / narrator.local.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 输出分段结果
    Segment {
        file: PathBuf,
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 列出远程合成服务的音色
    Voices {
        /// 语言前缀过滤，如 zh
        #[arg(long)]
        language: Option<String>,
    },
    /// 批量合成整本书并导出为 MP3
    Export {
        file: PathBuf,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        speed: Option<f64>,
        /// 输出目录
        #[arg(long)]
        out: Option<PathBuf>,
        /// 从第 N 句开始（从 1 开始）
        #[arg(long, default_value_t = 1)]
        from: usize,
        /// 连续失败时自动继续，不询问
        #[arg(long)]
        yes: bool,
        /// 不连接合成服务，使用脚本化的假音频
        #[arg(long)]
        offline: bool,
    },
    /// 导出 SSML
    Ssml {
        file: PathBuf,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        speed: Option<f64>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// 导出分段后的纯文本
    Text {
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// 交互式朗读预览
    Narrate {
        file: PathBuf,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        speed: Option<f64>,
        /// 从第 N 句开始（从 1 开始）
        #[arg(long, default_value_t = 1)]
        from: usize,
        #[arg(long)]
        offline: bool,
    },
    /// 输出生效的配置
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);
    print_config(&config);

    match cli.command {
        Command::Segment { file, json } => segment(&config, file, json).await,
        Command::Voices { language } => voices(&config, language).await,
        Command::Export {
            file,
            voice,
            speed,
            out,
            from,
            yes,
            offline,
        } => {
            let options = ExportOptions {
                voice: voice_or_default(&config, voice),
                speed: speed_or_default(&config, speed),
                output_dir: out.unwrap_or_else(|| config.export.output_dir.clone()),
                resume_from: from.saturating_sub(1),
                yes,
                offline,
            };
            export(&config, file, options).await
        }
        Command::Ssml {
            file,
            voice,
            speed,
            out,
        } => {
            let book = open_book(&config, file.clone()).await?;
            let path = ExportSsmlHandler
                .handle(ExportSsml {
                    units: book.units().clone(),
                    voice: voice_or_default(&config, voice),
                    speed: speed_or_default(&config, speed),
                    output: out.unwrap_or_else(|| file.with_extension("ssml")),
                })
                .await?;
            println!("已保存: {}", path.display());
            Ok(())
        }
        Command::Text { file, out } => {
            let book = open_book(&config, file.clone()).await?;
            let path = ExportTextHandler
                .handle(ExportText {
                    units: book.units().clone(),
                    output: out.unwrap_or_else(|| file.with_extension("segmented.txt")),
                })
                .await?;
            println!("已保存: {}", path.display());
            Ok(())
        }
        Command::Narrate {
            file,
            voice,
            speed,
            from,
            offline,
        } => {
            let voice = voice_or_default(&config, voice);
            let speed = speed_or_default(&config, speed);
            narrate(&config, file, voice, speed, from, offline).await
        }
        Command::Config => {
            println!("{}", render_config(&config)?);
            Ok(())
        }
    }
}

/// 初始化日志，输出到 stderr
fn init_tracing(log: &LogConfig) {
    let log_filter = format!("{},narrator={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn voice_or_default(config: &AppConfig, voice: Option<String>) -> VoiceSelection {
    VoiceSelection::parse(voice.as_deref().unwrap_or(&config.playback.voice))
}

fn speed_or_default(config: &AppConfig, speed: Option<f64>) -> Speed {
    Speed::new(speed.unwrap_or(config.playback.speed))
}

fn synthesis_client(config: &AppConfig, offline: bool) -> anyhow::Result<Arc<dyn SynthesisPort>> {
    if offline {
        tracing::info!("Offline mode, using scripted synthesis");
        return Ok(Arc::new(ScriptedSynthesisClient::new()));
    }
    let http = HttpSynthesisClient::new(config.synthesis.client_config())?;
    Ok(Arc::new(RetryingSynthesisClient::new(
        Arc::new(http),
        config.synthesis.retry_policy(),
    )))
}

async fn open_book(config: &AppConfig, path: PathBuf) -> Result<Book, ApplicationError> {
    let handler = OpenBookHandler::new(
        Arc::new(PlainTextSource),
        config.segmenter.segmenter_config(),
    );
    handler.handle(OpenBook { path }).await
}

// ============================================================================
// segment / voices
// ============================================================================

async fn segment(config: &AppConfig, file: PathBuf, json: bool) -> anyhow::Result<()> {
    let book = open_book(config, file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&book.units()[..])?);
        return Ok(());
    }

    for (index, unit) in book.units().iter().enumerate() {
        let flag = if unit.is_structural() { "#" } else { " " };
        println!("{:>5} {} {}", index + 1, flag, unit.text());
        if unit.has_trailing_break() {
            println!();
        }
    }
    eprintln!("《{}》共 {} 句，其中标题 {} 个", book.title(), book.len(), book.heading_count());
    Ok(())
}

async fn voices(config: &AppConfig, language: Option<String>) -> anyhow::Result<()> {
    let synthesis = synthesis_client(config, false)?;
    let catalog = ListVoicesHandler::new(synthesis)
        .handle(ListVoices { language })
        .await?;

    for voice in &catalog.voices {
        let mark = if voice.is_recommended { "★" } else { " " };
        println!(
            "{} online:{:<32} {:<16} {}",
            mark,
            voice.name,
            voice.short_display_name(),
            voice.language
        );
    }
    if let Some(default_voice) = catalog.default_voice {
        eprintln!("默认音色: {}", default_voice);
    }
    Ok(())
}

// ============================================================================
// export
// ============================================================================

struct ExportOptions {
    voice: VoiceSelection,
    speed: Speed,
    output_dir: PathBuf,
    resume_from: usize,
    yes: bool,
    offline: bool,
}

async fn export(config: &AppConfig, file: PathBuf, options: ExportOptions) -> anyhow::Result<()> {
    let book = open_book(config, file).await?;

    let event_publisher = EventPublisher::new().arc();
    let printer = tokio::spawn(print_events(event_publisher.subscribe()));

    let decision: Arc<dyn DecisionPort> = if options.yes {
        Arc::new(FixedDecision::new(true))
    } else {
        Arc::new(StdinDecisionProvider::stdin())
    };
    let pipeline = BatchPipeline::new(
        config.batch.pipeline_config(),
        synthesis_client(config, options.offline)?,
        SharedUnitCache::new(config.cache.capacity).arc(),
        decision.clone(),
        event_publisher,
    );
    let handler = Arc::new(ExportAudioHandler::new(Arc::new(pipeline)));

    // Ctrl-C 取消导出
    let canceller = {
        let handler = handler.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received interrupt, cancelling export");
                handler.cancel();
            }
        })
    };

    let result = handler
        .handle(ExportAudio {
            units: book.units().clone(),
            voice: options.voice,
            speed: options.speed,
            output_dir: options.output_dir.clone(),
            resume_from: options.resume_from,
        })
        .await;
    canceller.abort();

    match result {
        Ok(ExportOutcome::Saved { path, report }) => {
            println!("已保存: {}", path.display());
            println!("{}", report);
        }
        Ok(ExportOutcome::Suspended {
            resume_from,
            report,
        }) => {
            println!("已在第 {} 句暂停: {}", resume_from + 1, report);
            if report.succeeded > 0
                && decision
                    .confirm(&format!("是否保存已生成的 {} 句？", report.succeeded))
                    .await
            {
                if let ExportOutcome::Saved { path, .. } =
                    handler.save_partial(&options.output_dir).await?
                {
                    println!("已保存: {}", path.display());
                }
            }
            println!("可使用 --from {} 从该句继续导出", resume_from + 1);
        }
        Err(ApplicationError::UserCancelled) => {
            println!("已取消音频生成");
        }
        Err(e) => return Err(e.into()),
    }

    printer.abort();
    Ok(())
}

// ============================================================================
// narrate
// ============================================================================

const NARRATE_HELP: &str =
    "命令: p 暂停/继续, s 停止, j N 跳到第 N 句, + / - 调整语速, v 音色 切换音色, 回车 查看状态, q 退出";

async fn narrate(
    config: &AppConfig,
    file: PathBuf,
    voice: VoiceSelection,
    speed: Speed,
    from: usize,
    offline: bool,
) -> anyhow::Result<()> {
    let book = open_book(config, file).await?;
    if book.is_empty() {
        anyhow::bail!("文档中没有可朗读的内容");
    }

    let event_publisher = EventPublisher::new().arc();
    let printer = tokio::spawn(print_events(event_publisher.subscribe()));

    let (orchestrator, handle) = PlaybackOrchestrator::new(
        config.playback.playback_config(),
        book.units().clone(),
        voice,
        speed,
        synthesis_client(config, offline)?,
        SharedUnitCache::new(config.cache.capacity).arc(),
        Arc::new(PacedAudioOutput::default()),
        Arc::new(PacedSpeechDevice::default()),
        event_publisher,
    );
    let running = tokio::spawn(orchestrator.run());

    eprintln!("《{}》共 {} 句", book.title(), book.len());
    eprintln!("{}", NARRATE_HELP);

    if from > 1 {
        report(handle.seek(from - 1).await);
    }
    report(handle.start().await);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !dispatch(&handle, line.trim()).await {
            break;
        }
    }

    handle.shutdown().await;
    let _ = running.await;
    printer.abort();
    Ok(())
}

/// 处理一行交互命令；返回 false 表示退出
async fn dispatch(handle: &PlaybackHandle, line: &str) -> bool {
    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command {
        "q" => return false,
        "p" => report(handle.toggle().await),
        "s" => report(handle.stop().await),
        "+" => report(handle.adjust_speed(Speed::STEP).await),
        "-" => report(handle.adjust_speed(-Speed::STEP).await),
        "j" => match argument.parse::<usize>() {
            Ok(n) if n >= 1 => report(handle.seek(n - 1).await),
            _ => eprintln!("用法: j N（N 从 1 开始）"),
        },
        "v" if !argument.is_empty() => {
            report(handle.set_voice(VoiceSelection::parse(argument)).await)
        }
        "" => report(handle.snapshot().await),
        _ => eprintln!("{}", NARRATE_HELP),
    }
    true
}

fn report(result: Result<narrator::domain::playback::PlaybackSnapshot, ApplicationError>) {
    match result {
        Ok(snapshot) => eprintln!(
            "[{}] 第 {}/{} 句 ({}%) 音色 {} 语速 {:.1}x",
            snapshot.status.as_str(),
            snapshot.current_index + 1,
            snapshot.total,
            snapshot.percentage(),
            snapshot.voice,
            snapshot.speed
        ),
        Err(e) => eprintln!("操作失败: {}", e),
    }
}

/// 把事件打印到终端
async fn print_events(mut events: broadcast::Receiver<ReaderEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event printer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            ReaderEvent::UnitStarted {
                index, text, remote, ..
            } => {
                let backend = if remote { "在线" } else { "本机" };
                println!("[{} {}] {}", index + 1, backend, text);
            }
            ReaderEvent::Notice { level, message, .. } => {
                eprintln!("<{:?}> {}", level, message);
            }
            ReaderEvent::BatchProgress {
                percent, status, ..
            } => {
                eprintln!("[{:>3}%] {}", percent, status);
            }
            ReaderEvent::BatchFinished { report, .. } => {
                eprintln!("生成结束: {}", report);
            }
            ReaderEvent::PlaybackFinished { .. } => {
                eprintln!("朗读结束，输入 p 从头开始，q 退出");
            }
            ReaderEvent::ProgressChanged { .. } => {}
        }
    }
}

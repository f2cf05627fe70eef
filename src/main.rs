use anyhow::{bail, Context};
use browser_intent::{BrowserConfig, BrowserSession};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "browser-intent")]
#[command(about = "Drive a web page by intent: click, fill forms, log in")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User agent override
    #[arg(long)]
    user_agent: Option<String>,

    /// Minimum delay between actions, in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Print the final page body
    #[arg(short, long)]
    print: bool,

    /// Page to start from
    url: String,

    /// Steps to run in order: click:T, click!:T, link:T, link!:T,
    /// fill:name=value[,name=value...], login:USER:PASS:EXPECTED,
    /// expect:TEXT, goto:URL
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Click { target: String, exact: bool },
    Link { target: String, exact: bool },
    Fill(Vec<(String, String)>),
    Login {
        username: String,
        password: String,
        expected: String,
    },
    Expect(String),
    Goto(String),
}

impl FromStr for Step {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = raw
            .split_once(':')
            .ok_or_else(|| format!("step `{}` has no `kind:` prefix", raw))?;

        let step = match kind {
            "click" | "click!" => Step::Click {
                target: rest.to_string(),
                exact: kind.ends_with('!'),
            },
            "link" | "link!" => Step::Link {
                target: rest.to_string(),
                exact: kind.ends_with('!'),
            },
            "fill" => {
                let bindings = rest
                    .split(',')
                    .map(|pair| {
                        pair.split_once('=')
                            .map(|(name, value)| (name.to_string(), value.to_string()))
                            .ok_or_else(|| format!("fill binding `{}` is not name=value", pair))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Step::Fill(bindings)
            }
            "login" => {
                let mut parts = rest.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(username), Some(password), Some(expected)) => Step::Login {
                        username: username.to_string(),
                        password: password.to_string(),
                        expected: expected.to_string(),
                    },
                    _ => return Err(format!("login step `{}` needs USER:PASS:EXPECTED", raw)),
                }
            }
            "expect" => Step::Expect(rest.to_string()),
            "goto" => Step::Goto(rest.to_string()),
            other => return Err(format!("unknown step kind `{}`", other)),
        };
        Ok(step)
    }
}

impl Step {
    async fn run(&self, session: &mut BrowserSession) -> anyhow::Result<bool> {
        let done = match self {
            Step::Click { target, exact } => session.click(target, *exact).await?,
            Step::Link { target, exact } => session.click_link(target, *exact).await?,
            Step::Fill(bindings) => {
                let bindings: Vec<(&str, &str)> = bindings
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()))
                    .collect();
                session.execute_form(&bindings).await?
            }
            Step::Login {
                username,
                password,
                expected,
            } => {
                session
                    .login(username, password, |page| page.contains(expected))
                    .await?
            }
            Step::Expect(text) => session.contains(text),
            Step::Goto(url) => {
                session.navigate(url).await?;
                true
            }
        };
        Ok(done)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match &cli.config {
        Some(path) => BrowserConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => BrowserConfig::default(),
    };
    if let Some(user_agent) = cli.user_agent {
        config = config.with_user_agent(user_agent);
    }
    if let Some(delay) = cli.delay {
        config = config.with_minimum_timeout(Duration::from_millis(delay));
    }

    let mut session = BrowserSession::connect(config, &cli.url)
        .await
        .with_context(|| format!("opening {}", cli.url))?;
    info!(session = session.session_id(), status = session.status(), "ready");

    for (index, step) in cli.steps.iter().enumerate() {
        if !step.run(&mut session).await? {
            bail!("step {} ({:?}) did not succeed on {}", index + 1, step, session.url());
        }
        info!(step = index + 1, url = %session.url(), "step done");
    }

    if cli.print {
        println!("{}", session.page_content());
    }
    session.shutdown().await?;
    Ok(())
}

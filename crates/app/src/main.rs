use std::fmt;

use services::{AppServices, BackendConfig, Clock, QuizSession, SignUpOutcome, UserServices};
use study_core::model::{AuthSession, QuizId, QuizReference};

mod telemetry;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingCredentials,
    UnknownArg(String),
    InvalidAnswers { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingCredentials => {
                write!(f, "--email/--password (or STUDY_EMAIL/STUDY_PASSWORD) are required")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAnswers { raw } => write!(f, "invalid --answers value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  study [dashboard]                    [credentials]");
    eprintln!("  study quizzes                        [credentials]");
    eprintln!("  study take <quiz-id> --answers 1,0,2 [credentials]");
    eprintln!("  study reports                        [credentials]");
    eprintln!("  study report <report-id>             [credentials]");
    eprintln!("  study lectures                       [credentials]");
    eprintln!("  study signup                         [credentials]");
    eprintln!();
    eprintln!("Credentials:");
    eprintln!("  --email <email> --password <password>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_SUPABASE_URL, STUDY_SUPABASE_ANON_KEY, STUDY_CACHE_DB,");
    eprintln!("  STUDY_LECTURE_BUCKET, STUDY_LECTURES_PRIVATE, STUDY_EMAIL, STUDY_PASSWORD,");
    eprintln!("  STUDY_LOG, STUDY_LOG_FORMAT");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Dashboard,
    Quizzes,
    Take { quiz_id: QuizId, answers: Vec<usize> },
    Reports,
    Report { id: String },
    Lectures,
    SignUp,
}

struct Args {
    command: Command,
    email: String,
    password: String,
}

fn parse_answers(raw: &str) -> Result<Vec<usize>, ArgsError> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| ArgsError::InvalidAnswers { raw: raw.to_owned() })
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();
        let mut email = std::env::var("STUDY_EMAIL").unwrap_or_default();
        let mut password = std::env::var("STUDY_PASSWORD").unwrap_or_default();

        let name = match args.peek() {
            Some(first) if !first.starts_with("--") => args.next(),
            _ => None,
        };
        let mut positional = None;
        let mut answers = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--email" => email = require_value(&mut args, "--email")?,
                "--password" => password = require_value(&mut args, "--password")?,
                "--answers" => answers = parse_answers(&require_value(&mut args, "--answers")?)?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if !arg.starts_with("--") && positional.is_none() => positional = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_deref() {
            None | Some("dashboard") => Command::Dashboard,
            Some("quizzes") => Command::Quizzes,
            Some("take") => Command::Take {
                quiz_id: QuizId::new(positional.ok_or(ArgsError::MissingValue { flag: "take" })?),
                answers,
            },
            Some("reports") => Command::Reports,
            Some("report") => Command::Report {
                id: positional.ok_or(ArgsError::MissingValue { flag: "report" })?,
            },
            Some("lectures") => Command::Lectures,
            Some("signup") => Command::SignUp,
            Some(other) => return Err(ArgsError::UnknownArg(other.to_owned())),
        };

        if email.trim().is_empty() || password.is_empty() {
            return Err(ArgsError::MissingCredentials);
        }
        Ok(Self {
            command,
            email,
            password,
        })
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(argv).inspect_err(|e| {
        eprintln!("{e}");
        print_usage();
    })?;

    let config = BackendConfig::from_env()?;
    let app = AppServices::from_config(&config, Clock::default()).await?;
    let auth = app.auth();

    if args.command == Command::SignUp {
        match auth.sign_up(&args.email, &args.password).await? {
            SignUpOutcome::SignedIn(session) => println!("signed up as {}", session.user_id),
            SignUpOutcome::ConfirmationRequired { .. } => {
                println!("check your inbox to confirm {}", args.email);
            }
        }
        return Ok(());
    }

    let session = auth.sign_in(&args.email, &args.password).await?;
    let user = app.for_session(session.clone());
    let result = dispatch(&args.command, &user).await;
    if let Err(err) = auth.sign_out(&session).await {
        tracing::warn!(error = %err, "sign out failed");
    }
    result
}

async fn dispatch(command: &Command, user: &UserServices) -> Result<(), Box<dyn std::error::Error>> {
    let session: &AuthSession = user.session();
    match command {
        Command::Dashboard => {
            let progress = user.progress().today(session.user_id).await?;
            println!(
                "Today ({}): {}/{} tasks done",
                progress.date(),
                progress.completed(),
                progress.total()
            );
            for task in progress.tasks() {
                let mark = if task.completed { "x" } else { " " };
                println!("  [{mark}] {}", task.category);
            }
            println!("Latest lectures:");
            for item in user.lectures().latest(services::DEFAULT_LATEST).await? {
                println!("  {} ({})", item.lecture.title, item.lecture.subject);
            }
            println!("Upcoming:");
            for event in user.catalog().upcoming_events().await? {
                println!(
                    "  {} {}",
                    event.date_text.as_deref().unwrap_or("-"),
                    event.title
                );
            }
        }
        Command::Quizzes => {
            let listing = user.catalog().list_quizzes(session.user_id).await?;
            for group in listing.groups() {
                println!("{}", group.subject);
                for quiz in &group.items {
                    let mark = if quiz.taken { "*" } else { " " };
                    println!("  {mark} {} ({})", quiz.title, quiz.id);
                }
            }
        }
        Command::Take { quiz_id, answers } => {
            let session = take_quiz(user, quiz_id, answers).await?;
            let view = session.view();
            for question in &view.questions {
                let verdict = match question.outcome {
                    Some(outcome) if outcome.is_correct() => "correct",
                    Some(_) => "wrong",
                    None => "-",
                };
                println!("{:>3}. {} [{verdict}]", question.number, question.prompt);
            }
            if let Some(result) = view.result {
                println!("Score: {}/{}", result.score(), result.total());
            }
        }
        Command::Reports => {
            for report in user.reports().list_reports(session.user_id).await? {
                println!(
                    "{} {} {} score {}",
                    report.created_at.format("%Y-%m-%d"),
                    report.id,
                    report.quiz_title,
                    report.score
                );
            }
        }
        Command::Report { id } => {
            let detail = user.reports().report_detail(id).await?;
            println!(
                "{} ({}) score {}/{}",
                detail.quiz_title,
                detail.quiz_subject,
                detail.report.score,
                detail.total()
            );
            for line in detail.review() {
                println!("  {} -> {:?}", line.prompt, line.outcome);
            }
        }
        Command::Lectures => {
            for group in user.lectures().by_subject().await? {
                println!("{}", group.subject);
                for item in group.items {
                    println!("  {} {}", item.lecture.title, item.url);
                }
            }
        }
        Command::SignUp => {}
    }
    Ok(())
}

/// Answer the questions of `quiz_id` in order with `answers` and submit.
async fn take_quiz(
    user: &UserServices,
    quiz_id: &QuizId,
    answers: &[usize],
) -> Result<QuizSession, Box<dyn std::error::Error>> {
    let reference = user
        .catalog()
        .list_quizzes(user.session().user_id)
        .await?
        .quizzes()
        .find(|q| &q.id == quiz_id)
        .cloned()
        .unwrap_or_else(|| QuizReference {
            id: quiz_id.clone(),
            title: quiz_id.to_string(),
            subject: String::new(),
            taken: false,
        });

    let quiz = user.quiz();
    let mut session = quiz.initialize(&reference.encode())?;
    quiz.load_content(&mut session).await?;
    let ids: Vec<_> = session
        .content()
        .map(|c| c.questions().iter().map(|q| q.id().clone()).collect())
        .unwrap_or_default();
    for (id, &option) in ids.iter().zip(answers) {
        session.select_answer(id, option)?;
    }
    quiz.submit(&mut session).await?;
    Ok(session)
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

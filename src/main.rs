use clap::Parser;

use daybook::cli::{self, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, user } => cli::init::run(data_dir, user),
        Commands::Add {
            kind,
            category,
            amount,
            date,
            description,
        } => cli::add::run(
            &kind,
            &category,
            &amount,
            date.as_deref(),
            description.as_deref(),
        ),
        Commands::Edit {
            id,
            kind,
            category,
            amount,
            date,
            description,
        } => cli::edit::run(
            &id,
            kind.as_deref(),
            category.as_deref(),
            amount.as_deref(),
            date.as_deref(),
            description.as_deref(),
        ),
        Commands::Remove { id } => cli::remove::run(&id),
        Commands::Purge { from, to } => cli::purge::run(&from, &to),
        Commands::List {
            from,
            to,
            kind,
            category,
            limit,
            after,
        } => cli::list::run(&from, &to, &kind, &category, limit, after),
        Commands::Report {
            from,
            to,
            kind,
            category,
        } => cli::report::run(&from, &to, &kind, &category),
        Commands::Export {
            from,
            to,
            kind,
            category,
            output,
        } => cli::export::run(&from, &to, &kind, &category, output),
        Commands::Demo => cli::demo::run(),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

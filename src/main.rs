use clap::{CommandFactory, Parser};

use penny::cli::{
    self, AccountCommands, Cli, ClientsCommands, Commands, Context, InvoicesCommands,
};
use penny::error::Result;

fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email } => cli::auth::login(ctx, email),
        Commands::Logout => cli::auth::logout(ctx),
        Commands::Register => cli::auth::register(ctx),
        Commands::Whoami => cli::auth::whoami(ctx),
        Commands::Status => cli::status::run(ctx),
        Commands::Clients { command } => match command {
            ClientsCommands::List { search } => cli::clients::list(ctx, search.as_deref()),
            ClientsCommands::Add {
                name,
                email,
                phone,
                address,
            } => cli::clients::add(ctx, name, email, phone, address),
            ClientsCommands::Update {
                id,
                name,
                email,
                phone,
                address,
            } => cli::clients::update(ctx, id, name, email, phone, address),
            ClientsCommands::Delete { id, yes } => cli::clients::delete(ctx, id, yes),
        },
        Commands::Invoices { command } => match command {
            InvoicesCommands::List { search, status } => {
                cli::invoices::list(ctx, search.as_deref(), &status)
            }
            InvoicesCommands::Show { id } => cli::invoices::show(ctx, id),
            InvoicesCommands::Create { args } => cli::invoices::create(ctx, args),
            InvoicesCommands::Update { id, args } => cli::invoices::update(ctx, id, args),
            InvoicesCommands::Delete { id, yes } => cli::invoices::delete(ctx, id, yes),
            InvoicesCommands::Download { id, output } => cli::invoices::download(ctx, id, output),
            InvoicesCommands::Send { id } => cli::invoices::send(ctx, id),
            InvoicesCommands::Mark { id, status } => cli::invoices::mark(ctx, id, &status),
            InvoicesCommands::Summary => cli::invoices::summary(ctx),
        },
        Commands::Account { command } => match command {
            AccountCommands::Profile {
                name,
                email,
                address,
                phone,
            } => cli::account::profile(ctx, name, email, address, phone),
            AccountCommands::Banking {
                bank_name,
                account_name,
                account_number,
            } => cli::account::banking(ctx, bank_name, account_name, account_number),
            AccountCommands::Password => cli::account::password(ctx),
            AccountCommands::Deactivate { yes } => cli::account::deactivate(ctx, yes),
        },
        Commands::Generate { file, output } => cli::generate::run(ctx, &file, output),
        Commands::Completions { .. } => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "penny", &mut std::io::stdout());
        return;
    }

    penny::logging::init();

    let result = Context::load(cli.api_url.as_deref()).and_then(|ctx| match cli.command {
        Some(command) => dispatch(&ctx, command),
        None => cli::dashboard::run(&ctx),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

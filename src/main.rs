use sqlscout::core::db::connection::ConnectionManager;
use sqlscout::core::db::{query, schema};
use sqlscout::session::Session;
use tracing::info;

fn main() {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt::init();

    info!("Starting sqlscout...");

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: sqlscout <database> [passphrase]");
        std::process::exit(2);
    }
    let db_path = &args[1];
    let passphrase = args.get(2).map(String::as_str);

    let mut session = Session::new();
    let mut manager = ConnectionManager::new(&mut session);

    match manager.open(db_path, passphrase) {
        Ok(mut handle) => {
            println!("Opened database: {}", db_path);
            if let Err(e) = print_overview(&handle) {
                eprintln!("Failed to inspect database: {}", e);
            }
            handle.close();
        }
        Err(e) => {
            eprintln!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_overview(handle: &sqlscout::core::db::connection::DbHandle) -> sqlscout::core::Result<()> {
    let conn = handle.connection()?;
    for table in schema::table_names(conn)? {
        let count = query::count_total(
            conn,
            &format!("SELECT * FROM {}", schema::quote_identifier(&table)),
        )?;
        let pk = schema::primary_key_column(conn, &table)?;
        println!(
            "{} ({} rows, primary key: {})",
            table,
            count,
            pk.as_deref().unwrap_or("none")
        );
        for column in schema::columns(conn, &table)? {
            println!("    {} {}", column.name, column.type_name);
        }
    }
    Ok(())
}

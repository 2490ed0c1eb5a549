use clap::{arg, crate_version, Command};
use retroarc::archive;
use std::path::Path;
type STDRESULT = Result<(), Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn gather(cmd: &clap::ArgMatches) -> Vec<String> {
    match cmd.get_many::<String>("file") {
        Some(files) => files.cloned().collect(),
        None => Vec::new(),
    }
}

fn main() -> STDRESULT {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help = "Examples:
---------
Add files:       `retroarc add my.arc notes.txt data.bin`
List contents:   `retroarc list my.arc`
Extract all:     `retroarc extract my.arc`
Extract some:    `retroarc extract my.arc '*.txt'`
Delete:          `retroarc delete my.arc data.bin`";

    let mut main_cmd = Command::new("retroarc")
        .about("Archive files with retro LZSS + Huffman compression")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(
        Command::new("add")
            .arg(arg!(<archive> "archive path"))
            .arg(arg!(<file>... "files to add"))
            .about("add files to archive (replace if present)"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("replace")
            .arg(arg!(<archive> "archive path"))
            .arg(arg!(<file>... "files to replace"))
            .about("replace files already in archive"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("extract")
            .arg(arg!(<archive> "archive path"))
            .arg(arg!([file]... "files or patterns (default all)"))
            .arg(arg!(-d --dir <PATH> "destination directory").default_value("."))
            .about("extract files from archive"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("delete")
            .arg(arg!(<archive> "archive path"))
            .arg(arg!(<file>... "files or patterns"))
            .about("delete files from archive"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("print")
            .arg(arg!(<archive> "archive path"))
            .arg(arg!([file]... "files or patterns (default all)"))
            .about("print files on standard output"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("list")
            .arg(arg!(<archive> "archive path"))
            .arg(arg!([file]... "files or patterns (default all)"))
            .about("list contents of archive"),
    );

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("add") {
        let arc = cmd.get_one::<String>("archive").expect(RCH);
        let files = gather(cmd);
        if files.iter().any(|f| f.contains(['*', '?'])) {
            eprintln!("wildcards are not allowed when adding");
            return Err(Box::new(std::fmt::Error));
        }
        let count = archive::add(Path::new(arc), &files)?;
        eprintln!("  {} files", count);
    }

    if let Some(cmd) = matches.subcommand_matches("replace") {
        let arc = cmd.get_one::<String>("archive").expect(RCH);
        let count = archive::replace(Path::new(arc), &gather(cmd))?;
        eprintln!("  {} files", count);
    }

    if let Some(cmd) = matches.subcommand_matches("extract") {
        let arc = cmd.get_one::<String>("archive").expect(RCH);
        let dir = cmd.get_one::<String>("dir").expect(RCH);
        let count = archive::extract(Path::new(arc), &gather(cmd), Path::new(dir))?;
        eprintln!("  {} files", count);
    }

    if let Some(cmd) = matches.subcommand_matches("delete") {
        let arc = cmd.get_one::<String>("archive").expect(RCH);
        let count = archive::delete(Path::new(arc), &gather(cmd))?;
        eprintln!("  {} files", count);
    }

    if let Some(cmd) = matches.subcommand_matches("print") {
        let arc = cmd.get_one::<String>("archive").expect(RCH);
        let stdout = std::io::stdout();
        let count = archive::print(Path::new(arc), &gather(cmd), &mut stdout.lock())?;
        eprintln!("  {} files", count);
    }

    if let Some(cmd) = matches.subcommand_matches("list") {
        let arc = cmd.get_one::<String>("archive").expect(RCH);
        let entries = archive::list_entries(Path::new(arc), &gather(cmd))?;
        if !entries.is_empty() {
            println!("Filename     Mode  Original Compressed Ratio  Archived date/time  CRC Method");
        }
        for e in &entries {
            let r = archive::ratio(e.compsize as u64, e.origsize as u64);
            print!("{:<14}", e.name);
            if e.name.len() > 14 {
                print!("\n              ");
            }
            println!(
                " {} {:>9} {:>10} {:>2}.{}% {:>4}-{:02}-{:02} {:02}:{:02}:{:02}{} {:04X} {:>6}",
                match e.file_type & 1 {
                    0 => 'B',
                    _ => 'T',
                },
                e.origsize,
                e.compsize,
                r / 10,
                r % 10,
                e.year(),
                e.month(),
                e.day(),
                e.hour(),
                e.minute(),
                e.second(),
                e.tz_char(),
                e.file_crc,
                e.method
            );
        }
        eprintln!("  {} files", entries.len());
    }

    Ok(())
}

//! Main entry point for the sepack CLI app

use sepack::backup::Backup;
use sepack::cli::{self, Commands};
use sepack::filter::{
    FileTypeFilter, Filter, FilterChain, NameFilter, PathFilter, SizeFilter, TimeFilter, UserFilter,
};
use sepack::package::{self, PackageOptions};
use sepack::progress::{ConsoleProgress, ProgressSink};
use sepack::repository::Repository;
use sepack::restore::Restore;

fn main() -> std::process::ExitCode {
    if let Err(e) = run_app() {
        eprintln!("Error: {}", e);
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

fn run_app() -> Result<(), Box<dyn std::error::Error>> {
    match cli::run() {
        Commands::Backup {
            source,
            repo,
            include,
            exclude,
            types,
            name_contains,
            mtime_after,
            mtime_before,
            min_size,
            max_size,
            uid,
            gid,
            progress,
        } => {
            let mut chain = FilterChain::new();
            if !include.is_empty() || !exclude.is_empty() {
                let mut pf = PathFilter::new();
                for p in include {
                    pf.add_include(p);
                }
                for p in exclude {
                    pf.add_exclude(p);
                }
                chain.add(Box::new(pf));
            }
            if !types.is_empty() {
                chain.add(Box::new(FileTypeFilter::new(
                    types.into_iter().map(Into::into).collect(),
                )));
            }
            if !name_contains.is_empty() {
                chain.add(Box::new(NameFilter::new(name_contains)));
            }
            if mtime_after.is_some() || mtime_before.is_some() {
                chain.add(Box::new(TimeFilter::new(mtime_after, mtime_before)));
            }
            if min_size.is_some() || max_size.is_some() {
                chain.add(Box::new(SizeFilter::new(min_size, max_size)));
            }
            if uid.is_some() || gid.is_some() {
                chain.add(Box::new(UserFilter::new(uid, gid)));
            }

            let mut repository = Repository::new(&repo);
            repository.initialize()?;

            let filter: Option<&dyn Filter> = if chain.is_empty() { None } else { Some(&chain) };
            let mut console = ConsoleProgress::new();
            let sink: Option<&mut dyn ProgressSink> =
                if progress { Some(&mut console) } else { None };

            let mut backup = Backup::new(&mut repository);
            backup.execute(&source, filter, sink)?;
        }

        Commands::Restore { repo, target, progress } => {
            let mut repository = Repository::new(&repo);
            let mut console = ConsoleProgress::new();
            let sink: Option<&mut dyn ProgressSink> =
                if progress { Some(&mut console) } else { None };

            let mut restore = Restore::new(&mut repository);
            restore.execute(&target, sink)?;
            if restore.failed() > 0 {
                return Err(format!("{} files failed to restore", restore.failed()).into());
            }
        }

        Commands::List { repo } => {
            let mut repository = Repository::new(&repo);
            repository.load_index()?;
            println!("Repository index ({} entries):", repository.len());
            for rel in repository.list_files() {
                let meta = repository.get_metadata(&rel).expect("listed entry");
                if meta.is_symlink {
                    println!("- {} -> {} (mode {:o})", rel, meta.symlink_target, meta.mode);
                } else {
                    println!("- {} (mode {:o}, mtime {})", rel, meta.mode, meta.mtime);
                }
            }
        }

        Commands::Export { repo, package, pack, compress, encrypt, password } => {
            let opts = PackageOptions {
                layout: pack.into(),
                compression: compress.into(),
                encryption: encrypt.into(),
                password: cli::get_password_from_opt_or_env(password).unwrap_or_default(),
            };
            package::export_package(&repo, &package, &opts)?;
        }

        Commands::Import { package, repo, password } => {
            let password = cli::get_password_from_opt_or_env(password).unwrap_or_default();
            package::import_package(&package, &repo, &password)?;
        }
    }

    Ok(())
}

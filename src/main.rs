use anyhow::Context;
use clap::Parser;
use crossterm::style::Stylize;
use inquire::Confirm;
use patch_dylib_rs::{macho, patch, PatchOutcome, Replacements};
use std::{fs, path::Path, process::exit};

#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// The input file to be modified
    input_file: String,
    /// Path replacements, each as OLD=NEW (NEW must not be longer than OLD)
    #[arg(required = true)]
    replacements: Vec<String>,
    /// Modify the input file in place
    #[arg(long, short)]
    inplace: bool,
    /// Run without asking for confirmation
    #[arg(long, short('y'))]
    all_yes: bool,
    /// Output path
    #[arg(short, conflicts_with = "inplace")]
    output_file: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !Path::new(&args.input_file).exists() {
        eprintln!("Input file does not exist");
        exit(1);
    }

    if !fs::metadata(&args.input_file)
        .with_context(|| format!("reading metadata of `{}`", args.input_file))?
        .is_file()
    {
        eprintln!("Input file is not a file");
        exit(1);
    }

    let replacements = args.parse_replacements();

    let patched_file = if args.inplace {
        if !args.ask_for_confirmation(&format!(
            "Input file `{}` will be modified in place, continue?",
            args.input_file
        )) {
            exit(0);
        }
        args.input_file.clone()
    } else {
        let patched_file = args
            .output_file
            .clone()
            .unwrap_or(format!("{}_patched", args.input_file));
        if Path::new(&patched_file).exists() {
            if !args.ask_for_confirmation(&format!(
                "Output file `{}` already exists, overwrite?",
                patched_file
            )) {
                exit(0);
            }
        }
        patched_file
    };

    let mut data =
        fs::read(&args.input_file).with_context(|| format!("reading `{}`", args.input_file))?;

    let outcome = match patch(&mut data, &replacements) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            exit(1);
        }
    };

    report(&outcome, &replacements);

    fs::write(&patched_file, &data).with_context(|| format!("writing `{}`", patched_file))?;

    println!("{}", "Done!".green().bold());
    Ok(())
}

fn report(outcome: &PatchOutcome, replacements: &Replacements) {
    println!("match {} file", outcome.container.name().red());
    for arch in &outcome.archs {
        match &arch.uuid {
            Some(uuid) => println!(
                "match {} arch, uuid {}",
                macho::cpu_type_name(arch.cpu_type).red(),
                format_uuid(uuid)
            ),
            None => println!("match {} arch", macho::cpu_type_name(arch.cpu_type).red()),
        }
    }
    for old in &outcome.applied {
        if let Some((_, new)) = replacements.lookup(old) {
            println!("patched `{}` -> `{}`", old.clone().red(), new.green());
        }
    }
    if outcome.signature_invalidated {
        println!(
            "{}",
            "code signature is now invalid, re-sign the file (e.g. codesign --force)".yellow()
        );
    }
}

fn format_uuid(id: &[u8; 16]) -> String {
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        id[0], id[1], id[2], id[3], id[4], id[5], id[6], id[7],
        id[8], id[9], id[10], id[11], id[12], id[13], id[14], id[15]
    )
}

trait Utils {
    fn ask_for_confirmation(&self, msg: &str) -> bool;
    fn parse_replacements(&self) -> Replacements;
}

impl Utils for Args {
    fn ask_for_confirmation(&self, msg: &str) -> bool {
        if self.all_yes {
            return true;
        }

        Confirm::new(msg).with_default(true).prompt().unwrap()
    }

    fn parse_replacements(&self) -> Replacements {
        let mut replacements = Replacements::new();
        for pair in &self.replacements {
            let Some((old, new)) = pair.split_once('=') else {
                eprintln!(
                    "Replacement `{}` is not of the form OLD=NEW",
                    pair.clone().red()
                );
                exit(1);
            };
            if old.is_empty() {
                eprintln!("Replacement `{}` has an empty old path", pair.clone().red());
                exit(1);
            }
            if let Err(err) = replacements.insert(old, new) {
                eprintln!("{}", err.to_string().red());
                exit(1);
            }
        }
        replacements
    }
}

use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::contacts::generate_vcf_from_file;

#[derive(Subcommand)]
pub enum ContactsCommands {
    #[command(about = "Generate VCF contact cards from a list of phone numbers")]
    Generate {
        #[arg(short, long, help = "Text file with one phone number per line (default: <data>/phone_numbers/numbers.txt)")]
        input: Option<PathBuf>,
        #[arg(short, long, help = "Output VCF file name (default: <input stem>_contacts.vcf)")]
        output: Option<String>,
        #[arg(short, long, default_value = "Contact", help = "Prefix for contact names")]
        prefix: String,
    },
}

pub async fn handle(cmd: ContactsCommands, app: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ContactsCommands::Generate { input, output, prefix } => {
            let input = input.unwrap_or_else(|| app.paths.phone_numbers_dir.join("numbers.txt"));
            let summary = generate_vcf_from_file(&input, output.as_deref(), &prefix, &app.paths.phone_numbers_dir)?;

            if let OutputFormat::Text = output_format {
                println!("Total numbers in input file: {}", summary.total);
                println!("Numbers added to VCF: {}", summary.valid);
                println!("Numbers removed: {}", summary.duplicates + summary.invalid);
                println!("- Duplicate numbers: {}", summary.duplicates);
                println!("- Invalid numbers: {}", summary.invalid);
            }
            output_success(
                &output_format,
                &format!("Output file: {}", summary.output_file.display()),
                Some(serde_json::to_value(&summary)?),
            )
        }
    }
}

use super::*;
use crate::context::AppContext;
use crate::format::{self, Formattable, OutputFormat};

fn skopeo_for(ctx: &AppContext, dry_run: bool) -> Skopeo {
    Skopeo::new(
        ctx.config.skopeo.binary.clone(),
        dry_run || ctx.config.skopeo.dry_run,
    )
}

/// Handle the skopeo inspect command
pub fn handle_skopeo_inspect(ctx: &AppContext, image: &str, format: OutputFormat) {
    let skopeo = skopeo_for(ctx, false);

    let document = match inspect_image(&skopeo, &ctx.config.credential_store(), image) {
        Ok(document) => document,
        Err(e) => {
            format::error(&e.to_string());
            std::process::exit(1);
        }
    };

    let output = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&document).map_err(|e| e.to_string()),
        OutputFormat::Pretty | OutputFormat::Json => {
            serde_json::to_string_pretty(&document).map_err(|e| e.to_string())
        }
    };

    match output {
        Ok(output) => println!("{}", output.trim_end()),
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    }
}

/// Handle the skopeo copy command
pub fn handle_skopeo_copy(
    ctx: &AppContext,
    src: &str,
    dst: &str,
    all: bool,
    dry_run: bool,
    format: OutputFormat,
) {
    let skopeo = skopeo_for(ctx, dry_run);

    match copy_image(&skopeo, &ctx.config.credential_store(), src, dst, all) {
        Ok(result) if format == OutputFormat::Pretty => {
            if result.dry_run {
                format::warning(&format!("{} (dry run)", result.format_pretty()));
            } else {
                format::success(&result.format_pretty());
            }
        }
        Ok(result) => format::print_output(&result, format),
        Err(e) => {
            format::error(&e.to_string());
            std::process::exit(1);
        }
    }
}

use super::*;
use crate::context::AppContext;
use crate::format::{self, OutputFormat};

fn registry_or_exit(ctx: &AppContext) -> Registry {
    match Registry::from_config(&ctx.config) {
        Ok(registry) => registry,
        Err(e) => {
            format::error(&e.to_string());
            std::process::exit(1);
        }
    }
}

fn exit_on_error<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            format::error(&e.to_string());
            std::process::exit(1);
        }
    }
}

/// Handle the image parse command
pub fn handle_image_parse(reference: &str, format: OutputFormat) {
    let info = exit_on_error(parse_image(reference));
    format::print_output(&info, format);
}

/// Handle the image digest command
pub fn handle_image_digest(ctx: &AppContext, reference: &str, format: OutputFormat) {
    let registry = registry_or_exit(ctx);
    let info = exit_on_error(resolve_digest(&registry, &ctx.retry_policy(), reference));
    format::print_output(&info, format);
}

/// Handle the image compare command. Exits 1 when the images differ.
pub fn handle_image_compare(
    ctx: &AppContext,
    first: &str,
    second: &str,
    content: bool,
    format: OutputFormat,
) {
    let registry = registry_or_exit(ctx);
    let policy = ctx.retry_policy();

    let result = if content {
        compare_content(&registry, &policy, first, second)
    } else {
        compare_digests(&registry, &policy, first, second)
    };
    let result = exit_on_error(result);

    format::print_output(&result, format);
    if !result.same {
        std::process::exit(1);
    }
}

/// Handle the image tags command
pub fn handle_image_tags(ctx: &AppContext, reference: &str, format: OutputFormat, quiet: bool) {
    let registry = registry_or_exit(ctx);
    let tags = exit_on_error(list_tags(&registry, &ctx.retry_policy(), reference));

    if quiet {
        for item in &tags {
            println!("{}", item.tag);
        }
        return;
    }

    if tags.is_empty() {
        println!("No tags found.");
        return;
    }

    match format {
        OutputFormat::Pretty => {
            use tabled::{Table, settings::Style};
            let table = Table::new(&tags).with(Style::empty()).to_string();
            println!("{}", table);
        }
        _ => match format::format_output_vec(&tags, format) {
            Ok(output) => println!("{}", output.trim_end()),
            Err(e) => {
                format::error(&e);
                std::process::exit(1);
            }
        },
    }
}

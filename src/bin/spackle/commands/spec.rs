//! `spackle spec` command

use anyhow::{Context, Result};

use crate::cli::{SpecArgs, SpecFormat};
use spackle::core::spec::TreeOptions;
use spackle::core::Spec;
use spackle::util::GlobalContext;

const RULE: &str = "------------------------------";

pub fn execute(args: SpecArgs, ctx: &GlobalContext) -> Result<()> {
    let text = args.spec.join(" ");
    let registry = ctx.registry();

    let input = Spec::parse(&text)?;

    let mut normalized = input.clone();
    normalized
        .normalize(&registry)
        .with_context(|| format!("failed to normalize `{}`", text))?;

    let shown = if args.normalize {
        normalized.clone()
    } else {
        let config = ctx.concretizer_config()?;
        input
            .concretized(&registry, &config)
            .with_context(|| format!("failed to concretize `{}`", text))?
    };

    match args.format {
        SpecFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        SpecFormat::Flat => {
            println!("{}", shown);
        }
        SpecFormat::Tree => {
            let options = TreeOptions::default();
            print_section("Input spec", &input.tree(&options));
            print_section("Normalized", &normalized.tree(&options));
            if !args.normalize {
                print_section("Concretized", &shown.tree(&options));
            }
        }
    }

    if args.long && shown.is_concrete() {
        println!("hash: {}", shown.dag_hash());
    }

    Ok(())
}

fn print_section(title: &str, body: &str) {
    println!("{}", title);
    println!("{}", RULE);
    print!("{}", body);
    println!();
}

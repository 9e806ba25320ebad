//! Command-line interface for adt-schema

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use serde_json::{json, Value};

#[cfg(feature = "cli")]
use adt_schema::resolver::{ElementContent, TypeContract};
#[cfg(feature = "cli")]
use adt_schema::{BuildOptions, CodegenOptions, ParseOptions, Schema};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "adt-schema")]
#[command(author, version, about = "Schema-driven XML <-> JSON data binding", long_about = None)]
struct Cli {
    /// Log resolution and binding details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a schema description and resolve every declaration
    Check {
        /// Path to the schema description (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,
    },

    /// Display the structure of a schema description
    Inspect {
        /// Path to the schema description (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Show the flattened contract of one complex type
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Parse an XML document into JSON
    Parse {
        /// Path to the schema description (JSON)
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the XML file to parse
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Fail on missing required fields and invalid values
        #[arg(long)]
        strict: bool,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Build an XML document from JSON
    Build {
        /// Path to the schema description (JSON)
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the JSON file to serialize
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Root element to build when the input has several top-level keys
        #[arg(short, long)]
        root: Option<String>,

        /// Indent nested elements
        #[arg(short, long)]
        pretty: bool,

        /// Omit the XML declaration
        #[arg(long)]
        no_declaration: bool,
    },

    /// Generate Rust bindings for a schema description
    Codegen {
        /// Path to the schema description (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Check { schema } => cmd_check(schema),
        Commands::Inspect {
            schema,
            type_name,
            json,
        } => cmd_inspect(schema, type_name, json),
        Commands::Parse {
            schema,
            file,
            strict,
            pretty,
        } => cmd_parse(schema, file, strict, pretty),
        Commands::Build {
            schema,
            file,
            root,
            pretty,
            no_declaration,
        } => cmd_build(schema, file, root, pretty, no_declaration),
        Commands::Codegen { schema, output } => cmd_codegen(schema, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn load(schema_path: &Path) -> Result<Schema, Box<dyn std::error::Error>> {
    let schema = Schema::from_file(schema_path)?;
    schema.check()?;
    Ok(schema)
}

#[cfg(feature = "cli")]
fn cmd_check(schema_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load(&schema_path)?;
    println!(
        "✓ {} is valid ({} types)",
        schema_path.display(),
        schema.resolver().type_keys().len()
    );
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    schema_path: PathBuf,
    type_name: Option<String>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load(&schema_path)?;

    if let Some(type_name) = type_name {
        let contract = schema
            .contract(&type_name)?
            .ok_or_else(|| format!("'{}' is a simple type", type_name))?;
        if json_output {
            println!("{}", serde_json::to_string_pretty(&contract_json(&contract))?);
        } else {
            print_contract(&contract);
        }
        return Ok(());
    }

    if json_output {
        print_schema_json(&schema)?;
    } else {
        print_schema_summary(&schema);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn print_schema_summary(schema: &Schema) {
    let description = schema.description();

    println!("adt-schema v{}", adt_schema::VERSION);
    println!();
    println!("Schema Information:");
    match &description.namespace_uri {
        Some(ns) => println!("  Namespace: {}", ns),
        None => println!("  Namespace: (none)"),
    }
    if let Some(prefix) = &description.namespace_prefix {
        println!("  Prefix: {}", prefix);
    }
    println!("  Attribute Form Default: {}", description.attribute_form_default);
    println!();
    println!("Statistics:");
    println!("  Root Elements: {}", description.root_elements.len());
    println!("  Complex Types: {}", description.complex_types.len());
    println!("  Simple Types: {}", description.simple_types.len());
    println!("  Element Groups: {}", description.groups.len());
    println!("  Included Schemas: {}", description.included_schemas.len());
    println!("  Imported Schemas: {}", description.imported_schemas.len());

    println!("\n=== Root Elements ===");
    for element in &description.root_elements {
        let type_str = element.type_name.as_deref().unwrap_or("anonymous");
        let marker = if element.is_abstract { " (abstract)" } else { "" };
        println!("  {} : {}{}", element.name, type_str, marker);
    }

    println!("\n=== Types ===");
    for name in description.complex_types.keys() {
        println!("  {} (complex)", name);
    }
    for name in description.simple_types.keys() {
        println!("  {} (simple)", name);
    }
}

#[cfg(feature = "cli")]
fn print_schema_json(schema: &Schema) -> Result<(), Box<dyn std::error::Error>> {
    let description = schema.description();

    let elements: Vec<Value> = description
        .root_elements
        .iter()
        .map(|element| {
            json!({
                "name": element.name,
                "type": element.type_name,
                "abstract": element.is_abstract,
                "substitutionGroup": element.substitution_group,
            })
        })
        .collect();

    let output = json!({
        "namespaceUri": description.namespace_uri,
        "namespacePrefix": description.namespace_prefix,
        "attributeFormDefault": description.attribute_form_default.to_string(),
        "statistics": {
            "rootElements": description.root_elements.len(),
            "complexTypes": description.complex_types.len(),
            "simpleTypes": description.simple_types.len(),
            "elementGroups": description.groups.len(),
            "includedSchemas": description.included_schemas.len(),
            "importedSchemas": description.imported_schemas.len(),
        },
        "elements": elements,
        "complexTypes": description.complex_types.keys().collect::<Vec<_>>(),
        "simpleTypes": description.simple_types.keys().collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(feature = "cli")]
fn content_name(content: &ElementContent) -> String {
    match content {
        ElementContent::Simple(value_type) => value_type.name.clone(),
        ElementContent::Complex(key) => key.name.clone(),
    }
}

#[cfg(feature = "cli")]
fn contract_json(contract: &TypeContract) -> Value {
    let attributes: Vec<Value> = contract
        .attributes
        .iter()
        .map(|attribute| {
            json!({
                "name": attribute.name,
                "type": attribute.value_type.name,
                "required": attribute.decl.required,
                "default": attribute.decl.default,
            })
        })
        .collect();
    let elements: Vec<Value> = contract
        .elements
        .iter()
        .map(|element| {
            json!({
                "name": element.name,
                "type": content_name(&element.content),
                "minOccurs": element.min_occurs,
                "maxOccurs": element.max_occurs,
                "abstract": element.is_abstract,
            })
        })
        .collect();

    json!({
        "name": contract.name,
        "text": contract.text.as_ref().map(|t| t.name.clone()),
        "attributes": attributes,
        "elements": elements,
    })
}

#[cfg(feature = "cli")]
fn print_contract(contract: &TypeContract) {
    println!("Type: {}", contract.name);
    if let Some(text) = &contract.text {
        println!("  Text: {}", text.name);
    }
    if !contract.attributes.is_empty() {
        println!("  Attributes:");
        for attribute in &contract.attributes {
            let required = if attribute.decl.required { " (required)" } else { "" };
            println!("    @{} : {}{}", attribute.name, attribute.value_type.name, required);
        }
    }
    if !contract.elements.is_empty() {
        println!("  Elements:");
        for element in &contract.elements {
            let marker = if element.is_abstract { " (abstract)" } else { "" };
            println!(
                "    {} : {} [{}..{}]{}",
                element.name,
                content_name(&element.content),
                element.min_occurs,
                element.max_occurs,
                marker
            );
        }
    }
}

#[cfg(feature = "cli")]
fn cmd_parse(
    schema_path: PathBuf,
    file: PathBuf,
    strict: bool,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load(&schema_path)?;
    let xml = fs::read_to_string(&file)?;

    let options = if strict {
        ParseOptions::strict()
    } else {
        ParseOptions::default()
    };
    let value = schema.parse_with(&xml, &options)?;

    let json_str = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{}", json_str);
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_build(
    schema_path: PathBuf,
    file: PathBuf,
    root: Option<String>,
    pretty: bool,
    no_declaration: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load(&schema_path)?;
    let value: Value = serde_json::from_str(&fs::read_to_string(&file)?)?;

    let mut options = BuildOptions::default();
    if pretty {
        options = options.pretty();
    }
    if no_declaration {
        options = options.without_declaration();
    }
    if let Some(root) = root {
        options = options.with_root_name(root);
    }

    println!("{}", schema.build(&value, &options)?);
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_codegen(schema_path: PathBuf, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load(&schema_path)?;
    let code = adt_schema::generate(&schema, &CodegenOptions::default())?;

    if let Some(output_path) = output {
        fs::write(output_path, &code)?;
    } else {
        print!("{}", code);
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}

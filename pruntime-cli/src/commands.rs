//! Command execution.

use crate::Commands;
use colored::Colorize;
use pruntime_client::schema::{enum_schema, message_schema, ALL_ENUMS};
use pruntime_client::{ClientConfig, PhactoryClient, RpcError, PHACTORY_API};
use pruntime_wire::json::{from_json, to_json};
use pruntime_wire::{
    decode, encode, encode_delimited, unframe, Cardinality, EnumSchema, FieldKind, MessageSchema,
    Record,
};
use serde_json::Value;

type CommandResult = Result<String, Box<dyn std::error::Error>>;

/// Executes a command and returns the formatted output.
pub async fn execute(config: &ClientConfig, cmd: Commands) -> CommandResult {
    match cmd {
        Commands::Methods => Ok(list_methods()),

        Commands::Schema { name } => describe_schema(&name),

        Commands::Encode {
            schema,
            json,
            delimited,
        } => encode_record(&schema, &json, delimited),

        Commands::Decode {
            schema,
            hex,
            delimited,
        } => decode_record(&schema, &hex, delimited),

        Commands::Call { method, json } => {
            let descriptor = PHACTORY_API
                .method(&method)
                .ok_or_else(|| RpcError::UnknownMethod(method.clone()))?;
            let request = match json {
                Some(json) => from_json(descriptor.request, &parse_json_arg(&json)?)?,
                None => Record::new(descriptor.request),
            };

            let client = connect(config).await?;
            let response = client.call(descriptor.name, &request).await?;
            Ok(format_json(&to_json(&response)))
        }

        Commands::Echo { hex } => {
            let payload = parse_hex(&hex)?;
            let client = connect(config).await?;
            let echoed = client.echo(payload).await?;
            Ok(hex::encode(echoed))
        }
    }
}

async fn connect(config: &ClientConfig) -> Result<PhactoryClient, RpcError> {
    tracing::debug!("Connecting to worker at {}", config.addr);
    PhactoryClient::connect(config).await.map_err(|e| {
        eprintln!("{}: {}", "Connection failed".red(), e);
        e
    })
}

fn list_methods() -> String {
    let mut output = format!(
        "{}\n",
        format!("{}.{}", PHACTORY_API.package, PHACTORY_API.service).bold()
    );
    for method in PHACTORY_API.iter() {
        output.push_str(&format!(
            "  {:<22} {} -> {}\n",
            method.name.cyan(),
            method.request.name,
            method.response.name
        ));
    }
    output.trim_end().to_string()
}

fn describe_schema(name: &str) -> CommandResult {
    if let Some(schema) = message_schema(name) {
        return Ok(describe_message(schema));
    }
    if let Some(schema) = enum_schema(name) {
        return Ok(describe_enum(schema));
    }
    Err(format!("unknown schema '{}'", name).into())
}

fn describe_message(schema: &MessageSchema) -> String {
    let mut output = format!("{}", format!("message {}", schema.name).bold());
    for field in schema.fields {
        let label = match field.cardinality {
            Cardinality::Singular => "",
            Cardinality::Optional => "optional ",
            Cardinality::Required => "required ",
            Cardinality::Repeated => "repeated ",
        };
        let kind = match field.kind {
            FieldKind::Enum(e) => e.name,
            FieldKind::Message(m) => m.name,
            other => other.name(),
        };
        output.push_str(&format!(
            "\n  {:>3}  {}{} {}",
            field.number,
            label.dimmed(),
            kind.yellow(),
            field.name.cyan()
        ));
        if let Some(group) = field.oneof {
            output.push_str(&format!(" {}", format!("(oneof {})", group).dimmed()));
        }
    }
    output
}

fn describe_enum(schema: &EnumSchema) -> String {
    let mut output = format!("{}", format!("enum {}", schema.name).bold());
    for value in schema.values {
        output.push_str(&format!("\n  {:>3}  {}", value.number, value.name.cyan()));
    }
    output
}

fn encode_record(schema: &str, json: &str, delimited: bool) -> CommandResult {
    let schema = lookup_message(schema)?;
    let record = from_json(schema, &parse_json_arg(json)?)?;
    let encoded = if delimited {
        encode_delimited(&record)?
    } else {
        encode(&record)?
    };
    Ok(hex::encode(encoded))
}

fn decode_record(schema: &str, hex: &str, delimited: bool) -> CommandResult {
    let schema = lookup_message(schema)?;
    let bytes = parse_hex(hex)?;
    let payload = if delimited {
        unframe(&bytes)?
    } else {
        &bytes[..]
    };
    let record = decode(schema, payload)?;
    record.verify()?;
    Ok(format_json(&to_json(&record)))
}

fn lookup_message(name: &str) -> Result<&'static MessageSchema, String> {
    message_schema(name).ok_or_else(|| {
        if ALL_ENUMS.iter().any(|e| e.name == name) {
            format!("'{}' is an enum, not a record", name)
        } else {
            format!("unknown record schema '{}'", name)
        }
    })
}

/// Parses hex input, with or without a `0x` prefix.
fn parse_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let input = input.trim();
    hex::decode(input.strip_prefix("0x").unwrap_or(input))
}

/// Parses a JSON argument (either inline JSON or @file.json).
fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

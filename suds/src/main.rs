use std::{
    fs,
    path::{Path, PathBuf},
};

use structopt::StructOpt;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use suds_codegen as codegen;
use suds_wsdl::{self as wsdl, ContractModel, ContractOptions};

#[derive(Debug, Error)]
enum Error {
    #[error("Error parsing WSDL")]
    ParseError(#[from] wsdl::error::Error),

    #[error("Generated code is not valid Rust")]
    SyntaxError(#[from] syn::Error),

    #[error("Error reading arguments")]
    Args(#[from] std::io::Error),

    #[error("Error reading or writing {path}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(StructOpt)]
#[structopt(about = "Inspect WSDL files and generate SOAP proxies")]
enum Args {
    /// Lists the functions and types a WSDL describes
    Info { input: PathBuf },

    /// Writes proxy modules for every service of a WSDL
    Generate {
        #[structopt(short, long, default_value = "./output.rs")]
        output: PathBuf,

        input: PathBuf,
    },
}

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::IoError {
        path: path.to_path_buf(),
        source,
    })
}

fn info(input: &Path) -> Result<(), Error> {
    let contract = ContractModel::from_wsdl(&read(input)?, ContractOptions::new())?;

    println!("Functions:");
    for function in contract.list_functions().unwrap_or_default() {
        println!("  {}", function);
    }

    println!();
    println!("Types:");
    for ty in contract.list_types().unwrap_or_default() {
        println!("  {}", ty.replace('\n', "\n  "));
    }

    Ok(())
}

fn generate(input: &Path, output: &Path) -> Result<(), Error> {
    let tokens = codegen::from_wsdl(read(input)?)?;
    debug!("formatting generated code");

    let file: syn::File = syn::parse2(tokens)?;
    fs::write(output, prettyplease::unparse(&file)).map_err(|source| Error::IoError {
        path: output.to_path_buf(),
        source,
    })?;

    info!(output = %output.display(), "wrote proxy");
    Ok(())
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match args {
        Args::Info { input } => info(&input),
        Args::Generate { input, output } => generate(&input, &output),
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the `APIGateway` CRD YAML from the Rust type in src/crd.rs, so
//! deploy/crds/ never drifts from the code.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! The generated file is written to deploy/crds/ with the license header.

use anyhow::{Context, Result};
use api_gateway_operator::crd::APIGateway;
use kube::CustomResourceExt;
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<()> {
    let output_dir = Path::new("deploy/crds");
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    println!("Generating CRD YAML files from src/crd.rs...");
    generate_crd::<APIGateway>("apigateways.crd.yaml", output_dir)?;

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<()>
where
    T: CustomResourceExt,
{
    let yaml = serde_yaml::to_string(&T::crd())?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join(filename);
    fs::write(&output_path, content)
        .with_context(|| format!("writing {}", output_path.display()))?;

    println!("  ✓ Generated {filename}");
    Ok(())
}

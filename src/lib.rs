//! # shared-storages - Shared EFS storage stack
//!
//! shared-storages synthesizes a CloudFormation template that provisions a
//! shared, encrypted Elastic File System inside an existing VPC, together with
//! an access point and an IAM role (plus instance profile) allowed to mount it
//! as root.
//!
//! ## Core Concepts
//!
//! - **Lookup**: the target VPC is resolved by its `Name` tag, through a JSON
//!   context cache first and the EC2 API on a miss
//! - **Constructs**: typed builders declaring resources into a [`Stack`](constructs::Stack)
//!   under construct paths
//! - **Template**: the synthesized document with deterministic logical IDs
//! - **Review**: security checks over the emitted template
//! - **Cloud assembly**: the output directory holding the template and a manifest
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    CLI Interface                      │
//! │            (synth / lookup / graph / context)         │
//! └──────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                        App                            │
//! │        lookup → build → synthesize → review           │
//! └──────────────────────────────────────────────────────┘
//!          │                  │                  │
//!          ▼                  ▼                  ▼
//! ┌────────────────┐ ┌─────────────────┐ ┌────────────────┐
//! │  VpcResolver   │ │ SharedStorages  │ │    Review      │
//! │ (cache + EC2)  │ │     Stack       │ │    rules       │
//! └────────────────┘ └─────────────────┘ └────────────────┘
//!                           │
//!                           ▼
//! ┌──────────────────────────────────────────────────────┐
//! │            Template + CloudAssembly                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use shared_storages::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = ContextCache::load("cdk.context.json")?;
//!     let resolver = VpcResolver::with_provider(cache, Arc::new(Ec2VpcProvider::new()));
//!
//!     let props = StackProps {
//!         env: Environment::new(Some("123456789012".into()), Some("eu-west-1".into())),
//!         ..StackProps::default()
//!     };
//!     let synthesized = App::new(resolver).synth(&props).await?;
//!     CloudAssembly::write("cdk.out", &synthesized, TemplateFormat::Json)?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::app::{App, CloudAssembly, SynthesizedStack};
    pub use crate::config::Config;
    pub use crate::constructs::{Environment, Stack};
    pub use crate::error::{Error, Result};
    #[cfg(feature = "aws")]
    pub use crate::lookup::aws::Ec2VpcProvider;
    pub use crate::lookup::{
        ContextCache, StaticVpcProvider, VpcContext, VpcProvider, VpcQuery, VpcResolver,
    };
    pub use crate::review::{Finding, Severity};
    pub use crate::stack::{SharedStoragesStack, StackProps};
    pub use crate::template::{Template, TemplateFormat};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Configuration loading and merging.
pub mod config;

/// Resource dependency graph.
pub mod dependency;

// ============================================================================
// Synthesis
// ============================================================================

/// CloudFormation template model, intrinsics and logical IDs.
pub mod template;

/// Construct builders and the [`Stack`](constructs::Stack) container.
pub mod constructs;

/// The shared-storages stack definition.
pub mod stack;

/// Security review of synthesized templates.
pub mod review;

/// Synthesis pipeline and cloud assembly output.
pub mod app;

// ============================================================================
// Environment
// ============================================================================

/// VPC lookup and the context cache.
pub mod lookup;

/// Get the shared-storages version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

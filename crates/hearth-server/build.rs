use vergen_gitcl::{BuildBuilder, CargoBuilder, Emitter, GitclBuilder, RustcBuilder};

/// Git fields `src/version.rs` reads, with the variable a container build
/// can set instead when the checkout has no `.git`.
const GIT_OVERRIDES: [(&str, &str, &str); 4] = [
    ("VERGEN_GIT_SHA", "HEARTH_GIT_SHA", "unknown"),
    ("VERGEN_GIT_BRANCH", "HEARTH_GIT_BRANCH", "unknown"),
    ("VERGEN_GIT_COMMIT_TIMESTAMP", "HEARTH_GIT_COMMIT_TIMESTAMP", "unknown"),
    ("VERGEN_GIT_DIRTY", "HEARTH_GIT_DIRTY", "false"),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::default().build_timestamp(true).build()?;
    let cargo = CargoBuilder::default().target_triple(true).build()?;
    let rustc = RustcBuilder::default().semver(true).build()?;

    let mut emitter = Emitter::default();
    emitter
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&rustc)?;

    for (_, var, _) in GIT_OVERRIDES {
        println!("cargo::rerun-if-env-changed={var}");
    }

    if std::env::var("HEARTH_GIT_SHA").is_ok() {
        for (key, var, fallback) in GIT_OVERRIDES {
            let value = std::env::var(var).unwrap_or_else(|_| fallback.to_string());
            println!("cargo::rustc-env={key}={value}");
        }
    } else {
        let git = GitclBuilder::default()
            .sha(true)
            .branch(true)
            .commit_timestamp(true)
            .dirty(false)
            .build()?;
        emitter.add_instructions(&git)?;
    }

    emitter.emit()?;
    Ok(())
}

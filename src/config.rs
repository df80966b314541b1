use confique::Config as DeriveConfig;

#[derive(Debug, DeriveConfig)]
pub struct Config {
    /// How deeply objects/arrays may nest before validation gives up with a "nesting too
    /// deep" diagnostic. This bounds recursion; it is not meant to reject real documents.
    /// Can be overridden per invocation with `--max-depth`.
    #[config(default = 1024)]
    pub max_nesting_depth: usize,
}

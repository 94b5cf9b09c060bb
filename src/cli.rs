use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Build(BuildArgs),
    Mappings(MappingsArgs),
    Render(RenderArgs),
    Palette(PaletteArgs),
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Output directory for site data (must not exist).
    #[arg(long)]
    pub out: String,

    /// Comma separated locales to fetch.
    #[arg(long, default_value = "de,fr,it")]
    pub locales: String,

    /// CMS base URL (default: `THILO_API_BASE_URL` or the public API).
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Brand color as `#RRGGBB` (default: `THILO_PRIMARY_COLOR`).
    #[arg(long)]
    pub primary_color: Option<String>,

    /// Include the locale as a `lang` param in generated page paths.
    #[arg(long, default_value_t = false)]
    pub locale_param: bool,
}

#[derive(Debug, Args)]
pub struct MappingsArgs {
    /// Input `sections.json` (locale -> section records).
    #[arg(long)]
    pub sections: String,

    /// Output file path for `mappings.json`.
    #[arg(long)]
    pub out: String,

    /// Overwrite the output file if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    /// Render units as JSON.
    Units,
    /// Assembled page HTML.
    Html,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Markdown file to render.
    #[arg(long)]
    pub input: String,

    /// Output file (default: stdout).
    #[arg(long)]
    pub out: Option<String>,

    #[arg(long, value_enum, default_value_t = RenderFormat::Units)]
    pub format: RenderFormat,

    /// Fetch quiz documents and embed them (html format only).
    #[arg(long, default_value_t = false)]
    pub fetch_quizzes: bool,

    /// Base URL for relative quiz links (default: `THILO_API_BASE_URL`).
    #[arg(long)]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct PaletteArgs {
    /// Brand color as `#RRGGBB` (default: `THILO_PRIMARY_COLOR`).
    #[arg(long)]
    pub color: Option<String>,

    /// Wrap the declarations in a `:root` rule.
    #[arg(long, default_value_t = false)]
    pub stylesheet: bool,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Input `mappings.json`.
    #[arg(long)]
    pub mappings: String,

    #[arg(long)]
    pub section_id: String,

    /// Target locale.
    #[arg(long)]
    pub locale: String,
}

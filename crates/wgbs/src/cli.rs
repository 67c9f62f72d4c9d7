use std::path::{Path, PathBuf};

use clap::{Args, Parser, ValueEnum};

use wgbs_config::{ConfigDocument, ConfigValue};
use wgbs_observe::LoggerFormat;

const ABOUT: &str = "WGBS workflow: configuration and launch wrapper for whole-genome bisulfite sequencing analysis";

const USAGE_EXAMPLE: &str = "usage example:\n    wgbs --ri read_input_dir -w output-dir mm10";

/// Command line of one pipeline run.
///
/// Pipeline options are all optional: a flag that is not given takes its
/// value from the workflow defaults, and only values that differ from those
/// defaults override the user's config file.
#[derive(Debug, Parser)]
#[command(name = "wgbs", version, about = ABOUT, after_help = USAGE_EXAMPLE)]
pub struct WorkflowArgs {
    /// Genome acronym of the target organism (e.g. dm6, hs37d5, mm10)
    #[arg(value_name = "GENOME")]
    pub genome: String,

    /// Input directory containing the paired-end FASTQ files
    #[arg(short = 'i', long = "indir", visible_alias = "ri", value_name = "DIR")]
    pub indir: PathBuf,

    /// Working directory
    #[arg(short = 'w', long = "wdir", value_name = "DIR")]
    pub wdir: PathBuf,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// User configuration file, merged over the workflow defaults
    #[arg(short = 'c', long, value_name = "FILE")]
    pub configfile: Option<PathBuf>,

    /// User cluster configuration, merged over the shared and workflow cluster files
    #[arg(long = "cluster_configfile", value_name = "FILE")]
    pub cluster_configfile: Option<PathBuf>,

    /// Maximum number of concurrently submitted jobs, or cores when run locally
    #[arg(short = 'j', long = "jobs", value_name = "INT")]
    pub max_jobs: Option<u64>,

    /// Number of threads for multi-threaded tasks
    #[arg(long, visible_alias = "nt", value_name = "INT")]
    pub nthreads: Option<u64>,

    /// Run the workflow locally instead of submitting jobs to the cluster
    #[arg(long)]
    pub local: bool,

    /// Options passed through to the engine, e.g. '--dryrun --rerun-incomplete'
    #[arg(long = "snakemake_options", value_name = "STR", allow_hyphen_values = true)]
    pub snakemake_options: Option<String>,

    /// Root for the scratch directory exported as $TMPDIR and removed at the end of the run
    #[arg(long, value_name = "DIR")]
    pub tempdir: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub wrapper: WrapperArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrimMode {
    Auto,
    User,
}

impl TrimMode {
    fn as_str(self) -> &'static str {
        match self {
            TrimMode::Auto => "auto",
            TrimMode::User => "user",
        }
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Pipeline options")]
pub struct PipelineArgs {
    /// Randomly downsample each FASTQ file to this many reads
    #[arg(long, value_name = "INT")]
    pub downsample: Option<u64>,

    /// Read trimming; Illumina adaptors are trimmed unless told otherwise
    #[arg(long = "trimReads", value_enum)]
    pub trim_reads: Option<TrimMode>,

    /// Folder with fastqc.zip files used to detect the hard trimming threshold
    #[arg(long, value_name = "DIR")]
    pub fqcin: Option<String>,

    /// Trim Nextera adapters instead of TruSeq adapters
    #[arg(long, value_name = "BOOL")]
    pub nextera: Option<bool>,

    /// Trimming threshold for cutadapt
    #[arg(long = "trimThreshold", value_name = "STR")]
    pub trim_threshold: Option<String>,

    /// Additional arguments passed to cutadapt
    #[arg(long = "trimOtherArgs", value_name = "STR", allow_hyphen_values = true)]
    pub trim_other_args: Option<String>,

    /// Path to the converted reference genome
    #[arg(long = "cref", value_name = "STR")]
    pub convrefpath: Option<String>,

    /// Convert the reference genome
    #[arg(long = "convRef", value_name = "BOOL")]
    pub conv_ref: Option<bool>,

    /// BED file with target intervals; repeat for several files
    #[arg(long = "intList", value_name = "STR")]
    pub int_list: Vec<String>,

    /// BED file with SNP positions masked during methylation calling
    #[arg(long = "blackList", value_name = "STR")]
    pub black_list: Option<String>,

    /// Sample sheet used for statistical analysis
    #[arg(long = "sampleInfo", value_name = "STR")]
    pub sample_info: Option<String>,

    /// Nucleotides with M-bias to ignore during methylation extraction
    #[arg(long = "mbias", value_name = "STR")]
    pub mbias_ignore: Option<String>,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Wrapper settings")]
pub struct WrapperArgs {
    /// Workflow directory holding Snakefile, defaults.yaml and cluster.yaml
    /// [default: located relative to the executable]
    #[arg(long = "workflow-dir", env = "WGBS_WORKFLOW_DIR", value_name = "DIR")]
    pub workflow_dir: Option<PathBuf>,

    /// Directory holding the shared cluster.yaml [default: <workflow-dir>/../shared]
    #[arg(long = "shared-dir", env = "WGBS_SHARED_DIR", value_name = "DIR")]
    pub shared_dir: Option<PathBuf>,

    /// Engine executable
    #[arg(long, env = "WGBS_SNAKEMAKE", value_name = "PROGRAM", default_value = "snakemake")]
    pub snakemake: String,

    /// Milliseconds the engine gets to exit after SIGTERM before it is killed
    #[arg(long = "kill-grace-ms", value_name = "MS", default_value_t = 10_000)]
    pub kill_grace_ms: u64,

    /// Diagnostics format: text, json or journald
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Diagnostics filter directives, e.g. 'debug' or 'wgbs.exec=trace'
    #[arg(long = "log-level", value_name = "FILTER")]
    pub log_level: Option<String>,
}

impl WorkflowArgs {
    /// Filter directives for the logger; `--verbose` raises the default to `debug`.
    pub fn log_level(&self) -> String {
        match &self.wrapper.log_level {
            Some(level) => level.clone(),
            None if self.verbose => "debug".to_string(),
            None => "info".to_string(),
        }
    }

    /// Configuration values of the flags actually given on the command line.
    pub fn explicit_values(&self) -> ConfigDocument {
        let p = &self.pipeline;
        let mut doc = ConfigDocument::new();

        let mut set = |key: &str, value: Option<ConfigValue>| {
            if let Some(value) = value {
                doc = std::mem::take(&mut doc).with(key, value);
            }
        };

        set("verbose", self.verbose.then_some(ConfigValue::Bool(true)));
        set("configfile", self.configfile.as_deref().map(path_value));
        set("cluster_configfile", self.cluster_configfile.as_deref().map(path_value));
        set("max_jobs", self.max_jobs.map(ConfigValue::from));
        set("nthreads", self.nthreads.map(ConfigValue::from));
        set("snakemake_options", self.snakemake_options.clone().map(ConfigValue::from));
        set("tempdir", self.tempdir.as_deref().map(path_value));

        set("downsample", p.downsample.map(ConfigValue::from));
        set("trimReads", p.trim_reads.map(|m| ConfigValue::from(m.as_str())));
        set("fqcin", p.fqcin.clone().map(ConfigValue::from));
        set("nextera", p.nextera.map(ConfigValue::from));
        set("trimThreshold", p.trim_threshold.clone().map(ConfigValue::from));
        set("trimOtherArgs", p.trim_other_args.clone().map(ConfigValue::from));
        set("convrefpath", p.convrefpath.clone().map(ConfigValue::from));
        set("convRef", p.conv_ref.map(ConfigValue::from));
        set(
            "intList",
            (!p.int_list.is_empty()).then(|| ConfigValue::from(p.int_list.clone())),
        );
        set("blackList", p.black_list.clone().map(ConfigValue::from));
        set("sampleInfo", p.sample_info.clone().map(ConfigValue::from));
        set("mbias_ignore", p.mbias_ignore.clone().map(ConfigValue::from));

        doc
    }

    /// Every option at its effective command-line value: the explicit flags over `defaults`.
    pub fn candidate(&self, defaults: &ConfigDocument) -> ConfigDocument {
        defaults.merged(&self.explicit_values())
    }
}

fn path_value(path: &Path) -> ConfigValue {
    ConfigValue::from(path.display().to_string())
}

//! Command-line tool for inspecting, converting, and combining MCPL files.
//!
//! The argument grammar (concatenated short options like `-js10`, values
//! glued onto their flag character as in `-l10`/`-bKEY`/`-p-11`) follows
//! the historical tool rather than a generic getopt/clap parser, so a
//! script written against the compiled tool works unmodified against this
//! one. Long options may be abbreviated to any unambiguous prefix
//! (`--ju` for `--justhead`, `--mer` for `--merge`).

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use mcpl::tool::{self, MergeOptions};
use mcpl::{Error, Reader};

const LONG_OPTIONS: &[&str] = &[
    "help",
    "version",
    "justhead",
    "nohead",
    "text",
    "stats",
    "extract",
    "merge",
    "repair",
    "inplace",
    "forcemerge",
    "keepuserflags",
    "fakeversion",
];

#[derive(Debug, Default)]
struct Options {
    help: bool,
    version: bool,
    justhead: bool,
    nohead: bool,
    limit: Option<u64>,
    skip: Option<u64>,
    blobkey: Option<String>,
    pdgcode: Option<i32>,
    text: bool,
    stats: bool,
    extract: bool,
    merge: bool,
    repair: bool,
    inplace: bool,
    forcemerge: bool,
    keepuserflags: bool,
    fakeversion: bool,
    files: Vec<String>,
}

/// A parse or usage error; carries the message `bad()` would have printed
/// in the historical tool before exiting with status 1.
struct UsageError(String);

fn bad<T>(msg: impl Into<String>) -> Result<T, UsageError> {
    Err(UsageError(msg.into()))
}

fn usage(progname: &str) -> String {
    format!(
        "Tool for inspecting Monte Carlo Particle List (.mcpl) files.\n\n\
The default behaviour is to display the contents of FILE in human readable\n\
format (see Dump Options below for how to modify what is displayed).\n\n\
Usage:\n\
  {progname} [dump-options] FILE\n\
  {progname} -e -pPDG SRC DST\n\
  {progname} -m [--inplace] DST SRC1 [SRC2 ...]\n\
  {progname} -r FILE\n\
  {progname} -t SRC DST\n\
  {progname} --version\n\
  {progname} --help\n\n\
Dump options:\n\
  By default include the info in the FILE header plus the first ten\n\
  contained particles. Modify with the following options:\n\
  -j, --justhead  : Dump just header info and no particle info.\n\
  -n, --nohead    : Dump just particle info and no header info.\n\
  -lN             : Dump up to N particles from the file (default 10).\n\
                    Specify -l0 to disable the limit.\n\
  -sN             : Skip past the first N particles in the file.\n\
  -bKEY           : Dump binary blob stored under KEY to standard output.\n\n\
Extract/merge/repair:\n\
  -e, --extract -pPDG SRC DST\n\
                    Copy particles with the given pdgcode from SRC to DST.\n\
  -m, --merge DST SRC1 [SRC2 ...]\n\
                    Merge SRC1, SRC2, ... into a freshly created DST.\n\
  -m --inplace DST SRC1 [SRC2 ...]\n\
                    Append SRC1, SRC2, ... onto the existing file DST.\n\
  --forcemerge    : Permit merging inputs with mismatched precision.\n\
  --keepuserflags : Preserve userflags during merge even if some inputs\n\
                    lack them.\n\
  -r, --repair FILE\n\
                    Recover a truncated uncompressed file's particle count.\n\n\
Other options:\n\
  -t, --text SRC DST\n\
                    Read particle contents of SRC and write DST using a\n\
                    simple ASCII-based format.\n\
  --stats         : Not supported by this build.\n\
  -v, --version   : Display the version of this installation.\n\
  -h, --help      : Display this usage information (ignores all other\n\
                    options).\n"
    )
}

fn resolve_long(token: &str) -> Result<&'static str, UsageError> {
    let matches: Vec<&'static str> = LONG_OPTIONS
        .iter()
        .copied()
        .filter(|name| name.starts_with(token))
        .collect();
    match matches.as_slice() {
        [] => bad(format!("Unrecognised option: --{token}")),
        [one] => Ok(one),
        _ => bad(format!(
            "Ambiguous option --{token}; matches: {}",
            matches.join(", ")
        )),
    }
}

fn parse_args(args: &[String]) -> Result<Options, UsageError> {
    let mut opt = Options::default();
    let mut iter = args.iter();
    while let Some(a) = iter.next() {
        if let Some(rest) = a.strip_prefix("--") {
            if rest.is_empty() {
                return bad("Unrecognised option: --");
            }
            match resolve_long(rest)? {
                "help" => {
                    opt.help = true;
                    return Ok(opt);
                }
                "version" => opt.version = true,
                "justhead" => opt.justhead = true,
                "nohead" => opt.nohead = true,
                "text" => opt.text = true,
                "stats" => opt.stats = true,
                "extract" => opt.extract = true,
                "merge" => opt.merge = true,
                "repair" => opt.repair = true,
                "inplace" => opt.inplace = true,
                "forcemerge" => opt.forcemerge = true,
                "keepuserflags" => opt.keepuserflags = true,
                "fakeversion" => opt.fakeversion = true,
                other => unreachable!("unhandled long option {other}"),
            }
        } else if let Some(cluster) = a.strip_prefix('-') {
            if cluster.is_empty() {
                return bad("Unrecognised option: -");
            }
            let mut rest = cluster;
            while !rest.is_empty() {
                let mut chars = rest.chars();
                let f = chars.next().unwrap();
                rest = chars.as_str();
                match f {
                    'b' => {
                        if opt.blobkey.is_some() {
                            return bad("-b specified more than once");
                        }
                        if rest.is_empty() {
                            return bad("Missing argument for -b");
                        }
                        opt.blobkey = Some(rest.to_string());
                        rest = "";
                    }
                    'p' => {
                        if opt.pdgcode.is_some() {
                            return bad("-p specified more than once");
                        }
                        if rest.is_empty() {
                            return bad("Missing argument for -p");
                        }
                        opt.pdgcode = Some(
                            rest.parse()
                                .map_err(|_| UsageError("Bad option: expected an integer pdgcode for -p".to_string()))?,
                        );
                        rest = "";
                    }
                    'l' | 's' => {
                        if rest.is_empty() {
                            return bad("Bad option: missing number");
                        }
                        if !rest.bytes().all(|b| b.is_ascii_digit()) {
                            return bad("Bad option: expected number");
                        }
                        let value: u64 = rest
                            .parse()
                            .map_err(|_| UsageError("Bad option: number out of range".to_string()))?;
                        if f == 'l' {
                            if opt.limit.is_some() {
                                return bad("-l specified more than once");
                            }
                            opt.limit = Some(value);
                        } else {
                            if opt.skip.is_some() {
                                return bad("-s specified more than once");
                            }
                            opt.skip = Some(value);
                        }
                        rest = "";
                    }
                    'j' => opt.justhead = true,
                    'n' => opt.nohead = true,
                    'v' => opt.version = true,
                    't' => opt.text = true,
                    'e' => opt.extract = true,
                    'm' => opt.merge = true,
                    'r' => opt.repair = true,
                    'h' => {
                        opt.help = true;
                        return Ok(opt);
                    }
                    other => return bad(format!("Unrecognised option: -{other}")),
                }
            }
        } else {
            opt.files.push(a.clone());
        }
    }
    Ok(opt)
}

fn run(progname: &str, args: &[String]) -> Result<(), UsageError> {
    let opt = parse_args(args)?;

    if opt.help {
        print!("{}", usage(progname));
        return Ok(());
    }

    let number_dumpopts = [
        opt.justhead,
        opt.nohead,
        opt.limit.is_some(),
        opt.skip.is_some(),
        opt.blobkey.is_some(),
    ]
    .into_iter()
    .filter(|b| *b)
    .count();

    let mode_count = [
        opt.version,
        opt.text,
        number_dumpopts > 0,
        opt.extract,
        opt.merge,
        opt.repair,
        opt.stats,
    ]
    .into_iter()
    .filter(|b| *b)
    .count();
    if mode_count > 1 {
        return bad("Conflicting options specified.");
    }
    if number_dumpopts > 1 && opt.blobkey.is_some() {
        return bad("Do not specify other dump options with -b.");
    }

    if opt.stats {
        return bad("--stats is not supported by this build (statistics plotting lives outside this tool).");
    }

    if opt.version {
        if !opt.files.is_empty() {
            return bad("Unrecognised arguments for --version.");
        }
        let version = if opt.fakeversion {
            "0.0.0".to_string()
        } else {
            env!("CARGO_PKG_VERSION").to_string()
        };
        println!("mcpltool (mcpl {version})");
        return Ok(());
    }

    if opt.text {
        if opt.files.len() != 2 {
            return bad("Must specify both input and output files with --text.");
        }
        let src = PathBuf::from(&opt.files[0]);
        let dst = PathBuf::from(&opt.files[1]);
        if dst.exists() {
            return bad("Requested output file already exists.");
        }
        let mut reader = Reader::open(&src).map_err(to_usage_error)?;
        let mut out = std::fs::File::create(&dst).map_err(|e| UsageError(e.to_string()))?;
        tool::convert_to_ascii(&mut reader, &mut out).map_err(to_usage_error)?;
        return Ok(());
    }

    if opt.extract {
        let Some(pdgcode) = opt.pdgcode else {
            return bad("Must specify -pPDG with --extract.");
        };
        if opt.files.len() != 2 {
            return bad("Must specify both a source and a destination file with --extract.");
        }
        let src = PathBuf::from(&opt.files[0]);
        let dst = PathBuf::from(&opt.files[1]);
        let written = tool::extract_file(&src, &dst, pdgcode).map_err(to_usage_error)?;
        println!("Wrote {written} particles with pdgcode {pdgcode} to {}", dst.display());
        return Ok(());
    }

    if opt.merge {
        if opt.pdgcode.is_some() {
            return bad("-p is only meaningful with --extract.");
        }
        let min_files = if opt.inplace { 2 } else { 3 };
        if opt.files.len() < min_files {
            return bad(if opt.inplace {
                "In-place merge needs a destination and at least one source file."
            } else {
                "Merge needs a destination and at least two source files."
            });
        }
        let dest = PathBuf::from(&opt.files[0]);
        let sources: Vec<PathBuf> = opt.files[1..].iter().map(PathBuf::from).collect();
        let merge_options = MergeOptions {
            forcemerge: opt.forcemerge,
            keepuserflags: opt.keepuserflags,
        };
        let written = if opt.inplace {
            tool::merge_inplace(&dest, &sources, merge_options).map_err(to_usage_error)?
        } else {
            tool::merge(&dest, &sources, merge_options).map_err(to_usage_error)?
        };
        println!("Wrote {written} particles to {}", dest.display());
        return Ok(());
    }

    if opt.repair {
        if opt.files.len() != 1 {
            return bad("Must specify exactly one file with --repair.");
        }
        let path = PathBuf::from(&opt.files[0]);
        let recovered = tool::repair(&path).map_err(to_usage_error)?;
        println!("Repaired {}: recovered {recovered} particles.", path.display());
        return Ok(());
    }

    // Dump mode (the default).
    if opt.files.len() > 1 {
        return bad("Too many arguments.");
    }
    if opt.files.is_empty() {
        return bad("No input file specified.");
    }
    let path = PathBuf::from(&opt.files[0]);

    if let Some(key) = &opt.blobkey {
        let reader = Reader::open(&path).map_err(to_usage_error)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        tool::extract_blob(reader.header(), key.as_bytes(), &mut handle).map_err(to_usage_error)?;
        return Ok(());
    }

    if (opt.limit.is_some() || opt.skip.is_some()) && opt.justhead {
        return bad("Do not specify -l or -s with --justhead.");
    }
    if opt.justhead && opt.nohead {
        return bad("Do not supply both --justhead and --nohead.");
    }
    let limit = opt.limit.unwrap_or(10);
    let skip = opt.skip.unwrap_or(0);

    let mut reader = Reader::open(&path).map_err(to_usage_error)?;
    println!("Opened MCPL file {}:", path.display());
    if !opt.nohead {
        print!("{}", tool::dump_header(reader.header()));
    }
    if !opt.justhead {
        print!("{}", tool::dump_particles(&mut reader, limit, skip).map_err(to_usage_error)?);
    }
    Ok(())
}

fn to_usage_error(e: Error) -> UsageError {
    UsageError(e.to_string())
}

fn main() -> ExitCode {
    env_logger::init();
    let mut argv = std::env::args();
    let progname = argv
        .next()
        .map(|p| {
            std::path::Path::new(&p)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(p)
        })
        .unwrap_or_else(|| "mcpltool".to_string());
    let args: Vec<String> = argv.collect();

    if args.is_empty() {
        let _ = writeln!(
            std::io::stderr(),
            "ERROR: No input file specified\n\nRun with -h or --help for usage information"
        );
        return ExitCode::FAILURE;
    }

    match run(&progname, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(UsageError(msg)) => {
            let _ = writeln!(
                std::io::stderr(),
                "ERROR: {msg}\n\nRun with -h or --help for usage information"
            );
            ExitCode::FAILURE
        }
    }
}

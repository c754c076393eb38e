use std::env;
use std::fs;
use std::path::PathBuf;

use catalog::IndicatorCatalog;
use formats::boundaries::BoundaryKeys;
use streaming::FsDataSource;

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "audit" => cmd_audit(args),
        "demo" => cmd_demo(args),
        "catalog" => cmd_catalog(args),
        _ => Err(usage()),
    }
}

struct Common {
    root: PathBuf,
    catalog: Option<PathBuf>,
    json: bool,
    id_property: Option<String>,
    name_property: Option<String>,
}

fn parse_common(args: Vec<String>) -> Result<Common, String> {
    let mut root: Option<PathBuf> = None;
    let mut out = Common {
        root: PathBuf::new(),
        catalog: None,
        json: false,
        id_property: None,
        name_property: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" | "--id-property" | "--name-property" => {
                let flag = args[i].clone();
                i += 1;
                let Some(value) = args.get(i).cloned() else {
                    return Err(format!("{flag} requires a value"));
                };
                match flag.as_str() {
                    "--catalog" => out.catalog = Some(PathBuf::from(value)),
                    "--id-property" => out.id_property = Some(value),
                    _ => out.name_property = Some(value),
                }
            }
            "--json" => out.json = true,
            s if s.starts_with('-') => {
                return Err(format!("unknown arg: {s}\n\n{}", usage()));
            }
            s => {
                if root.is_some() {
                    return Err(format!("unexpected arg: {s}\n\n{}", usage()));
                }
                root = Some(PathBuf::from(s));
            }
        }
        i += 1;
    }

    out.root = root.ok_or_else(usage)?;
    Ok(out)
}

fn load_catalog(path: Option<&PathBuf>) -> Result<IndicatorCatalog, String> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p).map_err(|e| format!("read {p:?}: {e}"))?;
            IndicatorCatalog::from_json_str(&text).map_err(|e| format!("{p:?}: {e}"))
        }
        None => IndicatorCatalog::builtin().map_err(|e| e.to_string()),
    }
}

fn cmd_audit(args: Vec<String>) -> Result<(), String> {
    // atlas-data audit <data_root> [--catalog FILE] [--id-property P] [--name-property P] [--json]
    let opts = parse_common(args)?;
    let catalog = load_catalog(opts.catalog.as_ref())?;
    let mut keys = BoundaryKeys::default();
    if let Some(p) = opts.id_property {
        keys.id_property = p;
    }
    if let Some(p) = opts.name_property {
        keys.name_property = p;
    }

    let report = tools::audit(&catalog, &FsDataSource::new(&opts.root), &keys);
    if opts.json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!(
            "checked {} paths, {} regions, {} missing, {} errors",
            report.checked,
            report.regions.len(),
            report.missing.len(),
            report.errors.len()
        );
        for m in &report.missing {
            println!("missing  {m}");
        }
        for e in &report.errors {
            println!("error    {e}");
        }
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(format!("{:?} is incomplete", opts.root))
    }
}

fn cmd_demo(args: Vec<String>) -> Result<(), String> {
    // atlas-data demo <out_dir> [--catalog FILE]
    let opts = parse_common(args)?;
    let catalog = load_catalog(opts.catalog.as_ref())?;
    let summary = tools::write_demo(&catalog, &opts.root)?;
    println!(
        "wrote {} rasters and {} series under {:?} (legend images not included)",
        summary.rasters, summary.series, opts.root
    );
    Ok(())
}

fn cmd_catalog(args: Vec<String>) -> Result<(), String> {
    // atlas-data catalog <out_file> [--catalog FILE]
    let opts = parse_common(args)?;
    let catalog = load_catalog(opts.catalog.as_ref())?;
    let text = serde_json::to_string_pretty(&catalog.to_document()).map_err(|e| e.to_string())?;
    fs::write(&opts.root, text).map_err(|e| format!("write {:?}: {e}", opts.root))?;
    println!("wrote {:?}", opts.root);
    Ok(())
}

fn usage() -> String {
    [
        "usage:",
        "  atlas-data audit <data_root> [--catalog FILE] [--id-property P] [--name-property P] [--json]",
        "  atlas-data demo <out_dir> [--catalog FILE]",
        "  atlas-data catalog <out_file> [--catalog FILE]",
    ]
    .join("\n")
}

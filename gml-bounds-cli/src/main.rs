use anyhow::{Context, Result};
use clap::Parser;
use gml_bounds::parser::parse_gml;
use gml_bounds::{BoundsConfig, BoundsStamper, GmlVersion};
use rayon::ThreadPoolBuilder;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 入力GMLファイル（.gml / .xml）またはディレクトリ
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// 出力ディレクトリ
    #[arg(short, long, value_name = "DIR", required_unless_present = "report")]
    output: Option<PathBuf>,

    /// 書き込むGMLのバージョン（2 または 3）
    #[arg(long, value_name = "VERSION", default_value = "3", value_parser = parse_version)]
    gml_version: GmlVersion,

    /// boundedByに書くsrsName（省略時はジオメトリのsrsNameを使用）
    #[arg(long)]
    srs_name: Option<String>,

    /// 点に縮退したボックスを拡張しない
    #[arg(long)]
    no_pad: bool,

    /// ジオメトリが無い場合に書き込むnullの理由
    #[arg(long, default_value = "missing")]
    null_reason: String,

    /// 並列処理スレッド数（デフォルト: CPUコア数）
    #[arg(short, long)]
    threads: Option<usize>,

    /// ファイルを書き出さず、計算したボックスのみ表示
    #[arg(long)]
    report: bool,
}

impl Args {
    fn config(&self) -> BoundsConfig {
        BoundsConfig {
            version: self.gml_version,
            srs_name: self.srs_name.clone(),
            pad_points: !self.no_pad,
            null_reason: self.null_reason.clone(),
        }
    }
}

fn parse_version(s: &str) -> std::result::Result<GmlVersion, String> {
    s.parse::<GmlVersion>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    // ログの初期化（RUST_LOG未指定時はinfo）
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // CLI引数の解析
    let args = Args::parse();

    // 処理開始時間を記録
    let start_time = std::time::Instant::now();

    // スレッドプールの設定
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    // 出力ディレクトリの作成
    if let Some(output) = &args.output {
        fs::create_dir_all(output)?;
    }

    let stamper = BoundsStamper::new(args.config());

    // 入力パスの処理
    if args.input.is_file() {
        if !is_gml_file(&args.input) {
            error!("Unsupported file type: {:?}", args.input);
            anyhow::bail!("Input file must be .gml or .xml");
        }
        let root = args.input.parent().unwrap_or_else(|| Path::new(""));
        info!("Processing GML file: {:?}", args.input);
        process_file(&args.input, root, &args, &stamper)?;
    } else if args.input.is_dir() {
        info!("Processing directory: {:?}", args.input);
        process_directory(&args.input, &args, &stamper)?;
    } else {
        error!("Invalid input path: {:?}", args.input);
        anyhow::bail!("Input path must be a file or directory");
    }

    // 処理時間を表示
    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn is_gml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("gml") | Some("xml")
    )
}

fn process_file(path: &Path, root: &Path, args: &Args, stamper: &BoundsStamper) -> Result<()> {
    info!("Processing file: {:?}", path);

    // GMLファイルを解析
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut document = parse_gml(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    // ボックスを計算してboundedByを書き換え
    let bounds = stamper
        .stamp(&mut document)
        .with_context(|| format!("Failed to compute bounds of {}", path.display()))?;

    if args.report {
        if bounds.collection.is_empty() {
            println!("{}: no geometry", path.display());
        } else {
            println!(
                "{}: {} feature(s), lower {:?}, upper {:?}{}",
                path.display(),
                bounds.features.len(),
                bounds.collection.lower_left(),
                bounds.collection.upper_right(),
                if bounds.collection.is_padded() { " (padded)" } else { "" }
            );
        }
        return Ok(());
    }

    // 入力ディレクトリからの相対パスで出力
    let output_dir = args
        .output
        .as_ref()
        .context("Output directory is required unless --report is given")?;
    let relative = path.strip_prefix(root).unwrap_or(path);
    let output_path = output_dir.join(relative);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    document.write(BufWriter::new(output))?;
    info!("Written: {:?}", output_path);

    Ok(())
}

fn process_directory(dir: &Path, args: &Args, stamper: &BoundsStamper) -> Result<()> {
    use rayon::prelude::*;

    // GMLファイルを再帰的に収集
    let input_files = collect_input_files(dir)?;
    info!("Found {} input files (GML/XML)", input_files.len());

    // 並列処理でファイルを変換（ボックスはドキュメントごとに独立）
    let results: Vec<Result<()>> = input_files
        .par_iter()
        .map(|path| process_file(path, dir, args, stamper))
        .collect();

    // エラーをチェック
    let mut errors = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        if let Err(e) = result {
            errors.push(format!("{}: {:#}", input_files[i].display(), e));
        }
    }

    if !errors.is_empty() {
        error!("Failed to process {} files:", errors.len());
        for err in &errors {
            error!("  {}", err);
        }
        anyhow::bail!("{} files failed to process", errors.len());
    }

    Ok(())
}

fn collect_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    use rayon::prelude::*;

    let entries: Result<Vec<_>, _> = fs::read_dir(dir)?.collect();
    let entries = entries?;

    // エントリを並列処理し、サブディレクトリは再帰的に探索
    let nested: Vec<Vec<PathBuf>> = entries
        .into_par_iter()
        .map(|entry| -> Result<Vec<PathBuf>> {
            let path = entry.path();
            if path.is_dir() {
                collect_input_files(&path)
            } else if is_gml_file(&path) {
                Ok(vec![path])
            } else {
                Ok(Vec::new())
            }
        })
        .collect::<Result<_>>()?;

    let mut files: Vec<PathBuf> = nested.into_iter().flatten().collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gml_bounds::Document;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gml:FeatureCollection xmlns:gml="http://www.opengis.net/gml">
  <gml:featureMember><Site><gml:Point srsName="EPSG:4326"><gml:coordinates>0,0</gml:coordinates></gml:Point></Site></gml:featureMember>
  <gml:featureMember><Site><gml:Point srsName="EPSG:4326"><gml:coordinates>10,10</gml:coordinates></gml:Point></Site></gml:featureMember>
</gml:FeatureCollection>"#;

    #[test]
    fn test_collect_input_files_recurses() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("one.gml"), SAMPLE).unwrap();
        fs::write(nested.join("two.xml"), SAMPLE).unwrap();
        fs::write(nested.join("notes.txt"), "skip").unwrap();

        let files = collect_input_files(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_gml_file(f)));
    }

    #[test]
    fn test_process_directory_writes_stamped_copies() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::create_dir_all(input.path().join("sub")).unwrap();
        fs::write(input.path().join("sub").join("sites.gml"), SAMPLE).unwrap();

        let args = Args::parse_from([
            "gml-bounds",
            input.path().to_str().unwrap(),
            "-o",
            output.path().to_str().unwrap(),
            "--gml-version",
            "2",
        ]);
        let stamper = BoundsStamper::new(args.config());
        process_directory(input.path(), &args, &stamper).unwrap();

        let written = fs::read_to_string(output.path().join("sub").join("sites.gml")).unwrap();
        let document: Document = written.parse().unwrap();
        let boxed = document
            .root
            .find_child("boundedBy")
            .and_then(|b| b.find_child("Box"))
            .unwrap();
        assert_eq!(boxed.attribute("srsName"), Some("EPSG:4326"));
        assert_eq!(boxed.find_child("coordinates").unwrap().text(), "0,0 10,10");
    }

    #[test]
    fn test_process_directory_reports_failures() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("broken.gml"), "<a><b></a>").unwrap();

        let args = Args::parse_from([
            "gml-bounds",
            input.path().to_str().unwrap(),
            "-o",
            output.path().to_str().unwrap(),
        ]);
        let stamper = BoundsStamper::new(args.config());
        let err = process_directory(input.path(), &args, &stamper).unwrap_err();
        assert!(err.to_string().contains("1 files failed"));
    }

    #[test]
    fn test_args_reject_unknown_version() {
        let parsed = Args::try_parse_from(["gml-bounds", "in.gml", "-o", "out", "--gml-version", "4"]);
        assert!(parsed.is_err());

        let report = Args::try_parse_from(["gml-bounds", "in.gml", "--report", "--no-pad"]).unwrap();
        assert!(report.output.is_none());
        assert!(!report.config().pad_points);
    }
}

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catalog_translate::catalog::{
    ColumnMapping, DigestSynchronizer, FieldKey, InputRow, ResourceId, ShopifyClient, SyncOptions,
};
use catalog_translate::env::{self, CatalogEnv, EnvVar, TranslatorEnv};
use catalog_translate::translation::{
    OpenAiChatClient, TranslationCache, Translator, TranslatorConfig,
};
use catalog_translate::utils::rows;

#[derive(Parser)]
#[command(
    name = "catalog-translate",
    version,
    about = "Translate catalog titles and descriptions, then register them with digest-checked writes"
)]
struct Cli {
    /// 关闭彩色日志
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 翻译导出记录中缺少译文的标题和描述
    Translate(TranslateArgs),
    /// 把译文登记到商品目录
    Register(RegisterArgs),
    /// 读取一个商品并保存为待翻译记录
    Fetch(FetchArgs),
    /// 输出环境变量说明
    EnvDocs,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BrandMode {
    /// 统一品牌名的英文写法
    En,
    /// 保持模型输出
    #[value(name = "none")]
    Keep,
}

#[derive(Args)]
struct TranslateArgs {
    /// 导出记录（JSON数组）
    #[arg(long = "in", value_name = "FILE")]
    input: PathBuf,
    /// 输出文件，默认为 `<输入>_translated.json`
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// 覆盖 OPENAI_MODEL
    #[arg(long)]
    model: Option<String>,
    /// 已有译文也重新翻译
    #[arg(long)]
    force: bool,
    /// 删除译文中的 translate="no" 属性
    #[arg(long)]
    strip_translate_no: bool,
    /// 覆盖 TRANSLATION_CACHE
    #[arg(long, value_name = "FILE", conflicts_with = "no_cache")]
    cache: Option<PathBuf>,
    /// 只使用内存缓存
    #[arg(long)]
    no_cache: bool,
    #[arg(long, value_enum, default_value_t = BrandMode::En)]
    brand_normalize: BrandMode,
    /// 另外导出一份CSV
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "id"])))]
struct RegisterArgs {
    /// 输入行（.json 或 .csv）
    #[arg(long = "in", value_name = "FILE")]
    input: Option<PathBuf>,
    #[arg(long, default_value = "id")]
    id_col: String,
    #[arg(long, default_value = "title_en")]
    title_col: String,
    #[arg(long, default_value = "descriptionHtml_en")]
    desc_col: String,
    /// 单个商品ID（数字或完整gid）
    #[arg(long)]
    id: Option<String>,
    #[arg(long, requires = "id")]
    title_en: Option<String>,
    #[arg(long, requires = "id")]
    desc_en: Option<String>,
    /// 覆盖 TARGET_LANGUAGE
    #[arg(long)]
    locale: Option<String>,
    /// 摘要缺失时写入占位原文
    #[arg(long)]
    ensure_base: bool,
    #[arg(long, default_value = "—")]
    base_title: String,
    #[arg(long, default_value = "<p>—</p>")]
    base_desc: String,
    /// 登记后不回读
    #[arg(long)]
    no_verify: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("target").required(true).args(["id", "handle"])))]
struct FetchArgs {
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    handle: Option<String>,
    /// 输出文件，缺省时打印到标准输出
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn init_logging(no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(env::core::LogLevel::get_or_default("info".to_string()))
    });
    let ansi = !no_color
        && !env::core::NoColor::get_or_default(false)
        && atty::is(atty::Stream::Stderr);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let dotenv_path = env::load_dotenv();
    init_logging(cli.no_color);
    if let Some(path) = dotenv_path {
        info!("配置文件: {}", path.display());
    }

    match cli.cmd {
        Commands::Translate(args) => run_translate(args),
        Commands::Register(args) => run_register(args),
        Commands::Fetch(args) => run_fetch(args),
        Commands::EnvDocs => {
            print!("{}", env::generate_env_docs());
            Ok(())
        }
    }
}

fn run_translate(args: TranslateArgs) -> Result<(), Box<dyn Error>> {
    let config = TranslatorEnv::from_env()?;
    config.log_summary();

    let model = args.model.clone().unwrap_or_else(|| config.model.clone());
    let client = OpenAiChatClient::new(&config.api_key, &model, Some(&config.base_url))?;

    let cache_path = if args.no_cache {
        None
    } else {
        args.cache.clone().or_else(|| config.cache_path.clone())
    };
    let cache = TranslationCache::from_path(cache_path.as_deref());

    let mut translator_config =
        TranslatorConfig::for_locales(&config.original_language, &config.target_language);
    translator_config.postprocess.strip_translate_no = args.strip_translate_no;
    translator_config.postprocess.normalize_brands = args.brand_normalize == BrandMode::En;

    let mut records = rows::load_records(&args.input)?;
    info!("读取 {} 条记录: {}", records.len(), args.input.display());

    let mut translator = Translator::with_config(client, cache, translator_config);
    let summary = translator.process_records(&mut records, args.force);

    for record in records.iter_mut() {
        record
            .original_language
            .get_or_insert_with(|| config.original_language.clone());
        record
            .target_language
            .get_or_insert_with(|| config.target_language.clone());
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| rows::default_output_path(&args.input));
    rows::save_records(&out, &records)?;
    info!("已保存: {}", out.display());

    if let Some(csv_path) = &args.csv {
        let file = File::create(csv_path)?;
        rows::write_records_csv(file, &records)?;
        info!("已导出CSV: {}", csv_path.display());
    }

    translator.flush_cache()?;

    for (index, id, error) in &summary.failures {
        warn!("  #{} {}: {}", index + 1, id, error);
    }
    Ok(())
}

fn run_register(args: RegisterArgs) -> Result<(), Box<dyn Error>> {
    let config = CatalogEnv::from_env()?;
    config.log_summary();
    let client = ShopifyClient::new(&config.shopify_config())?;

    let mapping = ColumnMapping::default()
        .with_id_column(args.id_col.as_str())
        .with_field(FieldKey::Title, args.title_col.as_str())
        .with_field(FieldKey::BodyHtml, args.desc_col.as_str());

    let input_rows = match (&args.input, &args.id) {
        (Some(path), _) => rows::load_rows(path)?,
        (None, Some(id)) => vec![InputRow::new()
            .with(args.id_col.as_str(), id.as_str())
            .with(args.title_col.as_str(), args.title_en.clone().unwrap_or_default())
            .with(args.desc_col.as_str(), args.desc_en.clone().unwrap_or_default())],
        (None, None) => return Err("需要 --in 或 --id".into()),
    };
    info!("待处理 {} 行", input_rows.len());

    let options = SyncOptions {
        locale: args.locale.unwrap_or(config.target_language),
        ensure_base: args.ensure_base,
        base_title: args.base_title,
        base_description: args.base_desc,
        verify: !args.no_verify,
        mapping,
        ..SyncOptions::default()
    };

    let synchronizer = DigestSynchronizer::new(client, options);
    let report = synchronizer.run_batch(&input_rows);
    if report.failed > 0 {
        warn!("{} 行失败，详见上方日志", report.failed);
    }
    Ok(())
}

fn run_fetch(args: FetchArgs) -> Result<(), Box<dyn Error>> {
    let config = CatalogEnv::from_env()?;
    let original_language = env::core::OriginalLanguage::get()?;
    let client = ShopifyClient::new(&config.shopify_config())?;

    let item = match (&args.id, &args.handle) {
        (Some(id), _) => client.fetch_product(&ResourceId::product(id)?)?,
        (None, Some(handle)) => client.fetch_product_by_handle(handle)?,
        (None, None) => return Err("需要 --id 或 --handle".into()),
    };
    let item = item.ok_or("找不到商品")?;

    let record = rows::record_from_item(&item, &original_language, &config.target_language);
    match &args.out {
        Some(path) => {
            rows::save_records(path, &[record])?;
            info!("已保存: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&[record])?),
    }
    Ok(())
}

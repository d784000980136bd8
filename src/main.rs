use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Parser;
use tracing::error;
use weebcentral_fetch::config::CONFIG_FILE_NAME;
use weebcentral_fetch::utils::{confirm, is_end_of_input, prompt};
use weebcentral_fetch::{FetchConfig, WeebCentralCrawler, logging, parse_selection, select_chapters};

#[derive(Debug, Parser)]
#[command(name = "weebcentral-fetch")]
#[command(about = "Download manga chapters from WeebCentral")]
struct Cli {
    /// 系列页面链接（省略则交互输入）
    series_url: Option<String>,

    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 保存目录，覆盖配置文件
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// 每个章节同时下载的页数
    #[arg(long)]
    concurrency: Option<usize>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let mut config = FetchConfig::load_or_create(&config_path)?;
    if let Some(dir) = cli.save_dir {
        config.save_dir = Some(dir);
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }

    let crawler = WeebCentralCrawler::new(config)?;
    match session(&crawler, cli.series_url).await {
        Err(e) if input_closed(&e) => println!("\n输入已结束。"),
        other => other?,
    }

    println!("程序结束。");
    Ok(())
}

fn input_closed(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<io::Error>()
        .is_some_and(is_end_of_input)
}

async fn session(crawler: &WeebCentralCrawler, series_url: Option<String>) -> Result<()> {
    let mut last_url = series_url;
    let mut pending = last_url.is_some();

    loop {
        println!("\n=== weebcentral-fetch ===");
        let series_url = if pending {
            pending = false;
            last_url.clone().unwrap_or_default()
        } else {
            let input = prompt("请输入 WeebCentral 系列链接 (回车复用上次链接): ")?;
            if !input.is_empty() {
                input
            } else if let Some(url) = &last_url {
                println!("↩️ 复用上次链接: {}", url);
                url.clone()
            } else {
                println!("⚠️ 没有可复用的链接。");
                continue;
            }
        };
        last_url = Some(series_url.clone());

        let default_dir = crawler.config().resolved_save_dir();
        let save_dir = prompt(&format!("保存目录 (回车使用 {}): ", default_dir.display()))?;
        let save_dir = if save_dir.is_empty() {
            default_dir
        } else {
            PathBuf::from(save_dir)
        };

        if let Err(e) = run_series(crawler, &series_url, &save_dir).await {
            if input_closed(&e) {
                return Err(e);
            }
            error!("下载系列失败 ({}): {:#}", series_url, e);
        }

        if !confirm("\n是否继续下载其他漫画? (y/n): ")? {
            return Ok(());
        }
    }
}

async fn run_series(crawler: &WeebCentralCrawler, series_url: &str, save_dir: &Path) -> Result<()> {
    let info = crawler.get_series_info(series_url).await?;
    println!("\n📚 漫画: {}", info.title);
    println!("✍️ 作者: {}", info.authors.join(", "));
    println!("🏷️ 标签: {}", info.tags.join(", "));
    if !info.description.is_empty() {
        println!("📝 简介: {}", info.description);
    }

    let chapters = crawler.get_chapters(series_url).await?;
    if chapters.is_empty() {
        bail!("没有找到任何章节");
    }
    println!("\n共找到 {} 个章节。\n", chapters.len());

    for listing in crawler.list_chapters(&chapters).await {
        match listing.page_count {
            Some(count) => println!("{}. {} ({} 页)", listing.index, listing.label, count),
            None => println!("{}. {}", listing.index, listing.label),
        }
    }

    let selection = loop {
        let expr = prompt("\n请输入要下载的章节 (例如 1,3,5 或 2-4 或 all): ")?;
        let selection = match parse_selection(&expr, chapters.len()) {
            Ok(selection) => selection,
            Err(e) => {
                println!("输入错误: {}", e);
                continue;
            }
        };
        if let Err(e) = select_chapters(&chapters, &selection) {
            println!("输入错误: {}", e);
            continue;
        }
        if selection.is_empty() {
            println!("没有选择任何章节。");
            continue;
        }
        break selection;
    };

    let summary = crawler
        .download_selection(&info, &chapters, &selection, save_dir)
        .await?;

    println!("\n=== 下载结果 ===");
    for report in &summary.reports {
        let mark = if report.is_complete() { "✅" } else { "⚠️" };
        println!(
            "{} {}: {}/{} 页 -> {}",
            mark,
            report.chapter_label,
            report.succeeded,
            report.total(),
            report.folder.display()
        );
    }
    for chapter in &summary.skipped {
        println!("⏭️ {}: 没有页面，已跳过", chapter.title);
    }
    for (chapter, reason) in &summary.unresolved {
        println!("❌ {}: {}", chapter.title, reason);
    }
    println!("\n🎉 下载结束!");
    Ok(())
}

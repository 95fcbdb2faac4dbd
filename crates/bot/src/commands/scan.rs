use crate::CommandError;
use crate::Context;
use crate::HandlerFuture;
use crate::Invocation;
use crate::scan;
use mkw_ocr::OcrStatus;
use mkw_ocr::Tier;
use std::sync::Arc;

pub fn scanimage(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let images = ctx.gateway.recent_images(inv.channel, 1).await?;
        let Some(image) = images.into_iter().next_back() else {
            return Err(CommandError::Validation(
                "no recent image found in this channel".to_string(),
            ));
        };
        scan::single_scan(&ctx, inv.guild, inv.channel, inv.user, image).await
    })
}

pub fn bulkscanimage(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move { scan::bulk_scan(ctx.clone(), inv.guild, inv.channel, inv.user).await })
}

/// Raw OCR output for operator triage; bypasses name resolution.
pub fn debugocr(ctx: Arc<Context>, inv: Invocation) -> HandlerFuture {
    Box::pin(async move {
        let url = inv.args.trim();
        if url.is_empty() {
            return Err(CommandError::Validation(
                "usage: debugocr <image_url>".to_string(),
            ));
        }
        let bytes = ctx.gateway.download(url).await?;
        let output = ctx.engine.submit(Tier::Express, bytes).await;
        match output.status {
            OcrStatus::Error(message) => Ok(format!("ocr error: {}", message)),
            OcrStatus::Empty => Ok("ocr produced no text boxes".to_string()),
            OcrStatus::Ok => {
                let mut lines = vec![format!("{} text boxes:", output.boxes.len())];
                for b in output.boxes.iter() {
                    lines.push(format!(
                        "  {:>3.0}%  ({:>4},{:>4})  {}",
                        b.confidence, b.bounds.0, b.bounds.1, b.text
                    ));
                }
                Ok(lines.join("\n"))
            }
        }
    })
}

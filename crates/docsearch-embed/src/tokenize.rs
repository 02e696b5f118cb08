use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use docsearch_core::error::{Error, Result};

const PAD_ID: u32 = 1;

/// Encode a batch, truncating to `max_len` and right-padding to the longest
/// sequence. Returns `(input_ids, attention_mask)`, both [B,T].
pub fn tokenize_batch(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer
            .encode(text.as_str(), true)
            .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        ids.truncate(max_len);
        mask.truncate(max_len);
        rows.push((ids, mask));
    }
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut all_ids = Vec::with_capacity(rows.len() * width);
    let mut all_mask = Vec::with_capacity(rows.len() * width);
    for (mut ids, mut mask) in rows {
        ids.resize(width, PAD_ID);
        mask.resize(width, 0);
        all_ids.extend(ids);
        all_mask.extend(mask);
    }
    let shape = (texts.len(), width);
    let to_err = |e: candle_core::Error| Error::Embedding(e.to_string());
    let input_ids = Tensor::from_vec(all_ids, shape, device).map_err(to_err)?;
    let attention_mask = Tensor::from_vec(all_mask, shape, device).map_err(to_err)?;
    Ok((input_ids, attention_mask))
}

use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Model inputs for a single text, each shaped `[1, T]`.
pub struct EncodedInput {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Encode `text` truncated to `max_len` tokens. No padding: a batch of one
/// never needs it.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<EncodedInput> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let take = enc.get_ids().len().min(max_len);
    if take == 0 {
        return Err(anyhow!("tokenizer produced no tokens"));
    }
    let ids = &enc.get_ids()[..take];
    let type_ids = &enc.get_type_ids()[..take];
    let mask = &enc.get_attention_mask()[..take];
    Ok(EncodedInput {
        input_ids: Tensor::new(ids, device)?.unsqueeze(0)?,
        token_type_ids: Tensor::new(type_ids, device)?.unsqueeze(0)?,
        attention_mask: Tensor::new(mask, device)?.unsqueeze(0)?,
    })
}

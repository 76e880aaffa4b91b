// ============================================================
// Layer 5b - Sequence Classifiers
// ============================================================
// Three architectures, one contract:
//
//   forward(token_ids [B, T], attention_mask [B, T]) → logits [B, 2]
//
//   RnnClassifier         embedding → Elman cell (tanh) → last
//                         real hidden state → dropout → linear
//   LstmClassifier        embedding → LSTM → last real hidden
//                         state → dropout → linear
//   TransformerClassifier BERT encoder: token + position +
//                         segment embeddings → N post-norm
//                         blocks (padding-masked self-attention,
//                         GELU FFN) → tanh pooler on the first
//                         token → dropout → linear
//
// Reference: Elman (1990); Hochreiter & Schmidhuber (1997);
//            Vaswani et al. (2017) Attention Is All You Need

use burn::{
    nn::{
        transformer::{TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
    tensor::activation::tanh,
};

/// Number of output classes (legit, spam).
pub const NUM_CLASSES: usize = 2;

pub trait SequenceClassifier<B: Backend> {
    /// token_ids, attention_mask: [batch, seq_len] → logits: [batch, 2]
    fn forward(&self, token_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2>;
}

/// Hidden state at the last position whose mask is 1, per row.
/// seq: [B, T, H], mask: [B, T] → [B, H]. An all-padding row reads position 0.
fn last_real_step<B: Backend>(seq: Tensor<B, 3>, mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch, steps, hidden] = seq.dims();
    let positions = Tensor::<B, 1, Int>::arange(0..steps as i64, &seq.device())
        .unsqueeze::<2>()
        .expand([batch, steps]);
    let last  = (positions * mask).max_dim(1); // [B, 1]
    let index = last.unsqueeze_dim::<3>(2).expand([batch, 1, hidden]);
    seq.gather(1, index).reshape([batch, hidden])
}

// ─── Simple RNN ───────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct RnnClassifierConfig {
    pub vocab_size:  usize,
    #[config(default = 128)]
    pub embed_dim:   usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 0.2)]
    pub dropout:     f64,
}

impl RnnClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RnnClassifier<B> {
        RnnClassifier {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            input:     LinearConfig::new(self.embed_dim, self.hidden_size).init(device),
            recurrent: LinearConfig::new(self.hidden_size, self.hidden_size).with_bias(false).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            head:      LinearConfig::new(self.hidden_size, NUM_CLASSES).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct RnnClassifier<B: Backend> {
    pub embedding: Embedding<B>,
    pub input:     Linear<B>,
    pub recurrent: Linear<B>,
    pub dropout:   Dropout,
    pub head:      Linear<B>,
}

impl<B: Backend> SequenceClassifier<B> for RnnClassifier<B> {
    fn forward(&self, token_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, steps] = token_ids.dims();
        let embedded = self.embedding.forward(token_ids); // [B, T, E]

        // Precompute W·x_t + b for every step in one matmul
        let projected = self.input.forward(embedded); // [B, T, H]
        let [_, _, hidden_size] = projected.dims();
        let mask = attention_mask.float();

        let mut h = Tensor::<B, 2>::zeros([batch, hidden_size], &projected.device());
        for t in 0..steps {
            let x_t = projected.clone().slice([0..batch, t..t + 1, 0..hidden_size]).reshape([batch, hidden_size]);
            let m_t = mask.clone().slice([0..batch, t..t + 1]); // [B, 1]
            let candidate = tanh(x_t + self.recurrent.forward(h.clone()));
            // padding steps carry the previous state through unchanged
            h = candidate * m_t.clone() + h * (m_t.neg() + 1.0);
        }

        self.head.forward(self.dropout.forward(h))
    }
}

// ─── LSTM ─────────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct LstmClassifierConfig {
    pub vocab_size:  usize,
    #[config(default = 128)]
    pub embed_dim:   usize,
    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 0.2)]
    pub dropout:     f64,
}

impl LstmClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmClassifier<B> {
        LstmClassifier {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            lstm:      LstmConfig::new(self.embed_dim, self.hidden_size, true).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            head:      LinearConfig::new(self.hidden_size, NUM_CLASSES).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmClassifier<B: Backend> {
    pub embedding: Embedding<B>,
    pub lstm:      Lstm<B>,
    pub dropout:   Dropout,
    pub head:      Linear<B>,
}

impl<B: Backend> SequenceClassifier<B> for LstmClassifier<B> {
    fn forward(&self, token_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let embedded = self.embedding.forward(token_ids);
        let (hidden_seq, _state) = self.lstm.forward(embedded, None); // [B, T, H]
        let last = last_real_step(hidden_seq, attention_mask);
        self.head.forward(self.dropout.forward(last))
    }
}

// ─── Transformer Encoder (BERT layout) ───────────────────────────────────────
// Field names follow the BERT checkpoint layout closely enough that
// infra::pretrained can map HuggingFace weights straight onto
// BertEncoder with a handful of key remaps.

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerClassifierConfig {
    pub vocab_size:      usize,
    /// Rows of the position table
    pub max_seq_len:     usize,
    #[config(default = 128)]
    pub d_model:         usize,
    #[config(default = 4)]
    pub num_heads:       usize,
    #[config(default = 2)]
    pub num_layers:      usize,
    #[config(default = 256)]
    pub d_ff:            usize,
    #[config(default = 0.1)]
    pub dropout:         f64,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    /// First position id; RoBERTa checkpoints start after the padding id
    #[config(default = 0)]
    pub position_offset: usize,
    #[config(default = 1e-12)]
    pub layer_norm_eps:  f64,
}

impl TransformerClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerClassifier<B> {
        TransformerClassifier {
            bert:    self.init_encoder(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            head:    LinearConfig::new(self.d_model, NUM_CLASSES).init(device),
        }
    }

    /// Longest input the position table can take.
    pub fn max_input_len(&self) -> usize {
        self.max_seq_len.saturating_sub(self.position_offset)
    }

    fn init_encoder<B: Backend>(&self, device: &B::Device) -> BertEncoder<B> {
        let embeddings = BertEmbeddings {
            word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embeddings:   EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device),
            layer_norm: LayerNormConfig::new(self.d_model).with_epsilon(self.layer_norm_eps).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            position_offset: self.position_offset,
        };
        let encoder = TransformerEncoderConfig::new(self.d_model, self.d_ff, self.num_heads, self.num_layers)
            .with_dropout(self.dropout)
            .with_norm_first(false)
            .init(device);
        let pooler = LinearConfig::new(self.d_model, self.d_model).init(device);
        BertEncoder { embeddings, encoder, pooler }
    }
}

#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
    pub position_offset:       usize,
}

impl<B: Backend> BertEmbeddings<B> {
    /// token_ids: [B, T] → [B, T, d_model], single segment.
    pub fn forward(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = token_ids.dims();
        let device = token_ids.device();

        // position ids start at position_offset
        let start = self.position_offset as i64;
        let positions = Tensor::<B, 1, Int>::arange(start..start + seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let segments = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device);

        let x = self.word_embeddings.forward(token_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(segments);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

/// Embeddings, post-norm encoder stack and the tanh pooler over the
/// first token. The part a pre-trained checkpoint provides.
#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub encoder:    TransformerEncoder<B>,
    pub pooler:     Linear<B>,
}

impl<B: Backend> BertEncoder<B> {
    /// → pooled first-token state [B, d_model]
    pub fn forward(&self, token_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let pad_mask = attention_mask.equal_elem(0);
        let x = self.embeddings.forward(token_ids);
        let x = self.encoder.forward(TransformerEncoderInput::new(x).mask_pad(pad_mask)); // [B, T, d_model]

        let [batch_size, _, d_model] = x.dims();
        let first = x.slice([0..batch_size, 0..1, 0..d_model]).reshape([batch_size, d_model]);
        tanh(self.pooler.forward(first))
    }
}

#[derive(Module, Debug)]
pub struct TransformerClassifier<B: Backend> {
    pub bert:    BertEncoder<B>,
    pub dropout: Dropout,
    pub head:    Linear<B>,
}

impl<B: Backend> SequenceClassifier<B> for TransformerClassifier<B> {
    fn forward(&self, token_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let pooled = self.bert.forward(token_ids, attention_mask);
        self.head.forward(self.dropout.forward(pooled))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn inputs(device: &<TestBackend as Backend>::Device) -> (Tensor<TestBackend, 2, Int>, Tensor<TestBackend, 2, Int>) {
        let ids  = Tensor::<TestBackend, 2, Int>::from_data([[0, 0, 5, 6], [2, 3, 4, 7]], device);
        let mask = Tensor::<TestBackend, 2, Int>::from_data([[0, 0, 1, 1], [1, 1, 1, 1]], device);
        (ids, mask)
    }

    #[test]
    fn test_every_model_emits_two_logits_per_row() {
        let device = Default::default();
        let (ids, mask) = inputs(&device);

        let rnn = RnnClassifierConfig::new(10).with_embed_dim(8).with_hidden_size(8).init::<TestBackend>(&device);
        assert_eq!(rnn.forward(ids.clone(), mask.clone()).dims(), [2, NUM_CLASSES]);

        let lstm = LstmClassifierConfig::new(10).with_embed_dim(8).with_hidden_size(8).init::<TestBackend>(&device);
        assert_eq!(lstm.forward(ids.clone(), mask.clone()).dims(), [2, NUM_CLASSES]);

        let transformer = TransformerClassifierConfig::new(10, 4)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
            .init::<TestBackend>(&device);
        assert_eq!(transformer.forward(ids, mask).dims(), [2, NUM_CLASSES]);
    }

    #[test]
    fn test_transformer_ignores_trailing_padding() {
        let device = Default::default();
        let transformer = TransformerClassifierConfig::new(10, 6)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
            .with_dropout(0.0)
            .init::<TestBackend>(&device);

        let short = transformer.forward(
            Tensor::from_data([[2, 5, 6, 3]], &device),
            Tensor::from_data([[1, 1, 1, 1]], &device),
        );
        let padded = transformer.forward(
            Tensor::from_data([[2, 5, 6, 3, 0, 0]], &device),
            Tensor::from_data([[1, 1, 1, 1, 0, 0]], &device),
        );
        let a = short.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        let b = padded.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }

    #[test]
    fn test_position_offset_shrinks_usable_length() {
        let cfg = TransformerClassifierConfig::new(10, 514).with_position_offset(2);
        assert_eq!(cfg.max_input_len(), 512);
        let device = Default::default();
        let model = cfg.with_d_model(8).with_num_heads(2).with_num_layers(1).with_d_ff(16).init::<TestBackend>(&device);
        let ids  = Tensor::<TestBackend, 2, Int>::from_data([[0, 4, 2]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::from_data([[1, 1, 1]], &device);
        assert_eq!(model.forward(ids, mask).dims(), [1, NUM_CLASSES]);
    }

    #[test]
    fn test_last_real_step_follows_mask() {
        let device = Default::default();
        // hidden value == position index, so the gathered value is the index
        let seq = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 2.0], &device)
            .reshape([1, 3, 1])
            .repeat_dim(0, 2);
        let mask = Tensor::<TestBackend, 2, Int>::from_data([[1, 1, 0], [0, 1, 1]], &device);
        let last = last_real_step(seq, mask).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(last, vec![1.0, 2.0]);
    }

    #[test]
    fn test_rnn_ignores_leading_padding() {
        let device = Default::default();
        let rnn = RnnClassifierConfig::new(10)
            .with_embed_dim(4)
            .with_hidden_size(4)
            .with_dropout(0.0)
            .init::<TestBackend>(&device);

        let short = rnn.forward(
            Tensor::from_data([[5, 6]], &device),
            Tensor::from_data([[1, 1]], &device),
        );
        let padded = rnn.forward(
            Tensor::from_data([[0, 0, 5, 6]], &device),
            Tensor::from_data([[0, 0, 1, 1]], &device),
        );
        let a = short.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        let b = padded.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }
}

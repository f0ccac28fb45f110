use ferrite_nll::{ClassNllCriterion, Criterion, Tensor};
use rand::Rng;

fn main() -> ferrite_nll::Result<()> {
    // Per-pixel classification: [batch, classes, pixels].
    let (batch, classes, pixels) = (4, 3, 5);
    let logits = Tensor::random(&[batch, classes, pixels])?.map(|x| 4.0 * x - 2.0);
    let probs = logits.softmax(1)?;

    let mut rng = rand::thread_rng();
    let labels: Vec<f64> = (0..batch * pixels).map(|_| rng.gen_range(0..classes) as f64).collect();
    let targets = Tensor::new(vec![batch, pixels], labels.clone())?;

    let mut one_hot = Tensor::zeros(&[batch, pixels, classes])?.into_data();
    for (i, &label) in labels.iter().enumerate() {
        one_hot[i * classes + label as usize] = 1.0;
    }
    let dense = Tensor::new(vec![batch, pixels, classes], one_hot)?.move_last_axis_to(1)?;

    let nll = ClassNllCriterion::default();
    println!("sparse targets:  loss = {:.6}", nll.forward(&probs, &targets)?);
    println!("dense targets:   loss = {:.6}", nll.forward(&probs, &dense)?);

    // Same data with classes last.
    let last = ClassNllCriterion::new(None, 2)?;
    println!("classes last:    loss = {:.6}", last.forward(&probs.move_axis_to_last(1)?, &targets)?);

    let clipped = ClassNllCriterion::new(Some(1e-7), 1)?;
    let hard = probs.map(|p| if p > 0.5 { 1.0 } else { 0.0 });
    println!("hard, unclipped: loss = {:.6}", nll.forward(&hard, &targets)?);
    println!("hard, clipped:   loss = {:.6}", clipped.forward(&hard, &targets)?);

    let grad = nll.backward(&probs, &targets)?;
    println!("gradient shape {:?}, sum = {:.6}", grad.shape(), grad.sum());
    Ok(())
}

//! Example: connecting processes through their pipes
//!
//! The output pipe of one process becomes the input of the next. Both run
//! at the same time; the pipe buffer provides backpressure.

use proc_rs::{Proc, StreamDirective};

fn main() -> proc_rs::Result<()> {
    let mut producer = Proc::run(["printf", "pear\\napple\\nfig\\n"])
        .output(StreamDirective::Capture)
        .spawn()?;

    let mut sorter = Proc::run(["sort"])
        .input(producer.take_output()?.into_handle()?)
        .output(StreamDirective::Capture)
        .spawn()?;

    println!("Sorted:");
    for line in sorter.output_pipe()?.lines() {
        println!("  {}", line?);
    }

    producer.check_status()?;
    sorter.check_status()?;

    // Feeding a process through its input pipe
    let mut counter = Proc::run(["wc", "-l"])
        .input(StreamDirective::Capture)
        .output(StreamDirective::Capture)
        .spawn()?;

    let input = counter.input_pipe()?;
    for word in ["one", "two", "three"] {
        input.say(word)?;
    }
    counter.close_input();

    println!("Lines counted: {}", counter.output_pipe()?.slurp()?.trim());
    Ok(())
}
